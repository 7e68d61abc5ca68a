//! Phase classification for pull requests
//!
//! Every pull request is in exactly one [`Phase`], derived from who spoke last
//! in its review conversation and in what tone. Three parties take part: the
//! maintainer, an automated reviewer bot, and an automated agent bot that
//! applies fixes.

mod classify;

pub use classify::{RULES, Rule, classify, classify_with_rule};

use serde::{Deserialize, Serialize};

/// Workflow phase of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Draft with reviewers requested; waiting to be marked ready
    Draft,
    /// Reviewer feedback must be addressed by the agent
    NeedsFix,
    /// Ready for a human; the terminal phase
    ReadyForReview,
    /// The agent is processing; nothing to do
    AgentWorking,
}

impl Phase {
    /// All phases, in workflow order
    pub const ALL: [Self; 4] = [
        Self::Draft,
        Self::NeedsFix,
        Self::ReadyForReview,
        Self::AgentWorking,
    ];

    /// Stable short name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::NeedsFix => "needs-fix",
            Self::ReadyForReview => "ready-for-review",
            Self::AgentWorking => "agent-working",
        }
    }

    /// Whether this is the phase where work waits on a human
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ReadyForReview)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a review author in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewerRole {
    /// The automated reviewer
    ReviewerBot,
    /// The automated fixer
    AgentBot,
    /// Anyone else, including deleted accounts
    Other,
}

/// Logins of the two distinguished bots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotIdentities {
    /// Logins the reviewer bot posts under
    pub reviewer: Vec<String>,
    /// Logins the agent bot posts under
    pub agent: Vec<String>,
}

impl Default for BotIdentities {
    fn default() -> Self {
        Self {
            reviewer: vec!["copilot-pull-request-reviewer".to_string()],
            agent: vec!["copilot-swe-agent".to_string(), "Copilot".to_string()],
        }
    }
}

impl BotIdentities {
    /// Resolve an author login to its role (case-insensitive)
    ///
    /// The reviewer identity wins if a login is listed under both.
    pub fn role_of(&self, author: Option<&str>) -> ReviewerRole {
        let Some(login) = author else {
            return ReviewerRole::Other;
        };
        // GraphQL reports bot logins without the "[bot]" suffix REST uses
        let login = login.strip_suffix("[bot]").unwrap_or(login);
        if self.reviewer.iter().any(|r| r.eq_ignore_ascii_case(login)) {
            ReviewerRole::ReviewerBot
        } else if self.agent.iter().any(|a| a.eq_ignore_ascii_case(login)) {
            ReviewerRole::AgentBot
        } else {
            ReviewerRole::Other
        }
    }
}
