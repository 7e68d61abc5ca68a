//! Phase classifier - a pure, ordered decision table
//!
//! Rules are evaluated top to bottom and the first one that returns a phase
//! wins. Anything that falls through every rule is `AgentWorking`, which
//! makes the classifier total.

use super::{BotIdentities, Phase, ReviewerRole};
use crate::types::{PullRequestSnapshot, ReviewState};

/// Facts about a snapshot, with author roles resolved once
struct Facts<'a> {
    snapshot: &'a PullRequestSnapshot,
    roles: Vec<ReviewerRole>,
}

impl<'a> Facts<'a> {
    fn new(snapshot: &'a PullRequestSnapshot, bots: &BotIdentities) -> Self {
        let roles = snapshot
            .reviews
            .iter()
            .map(|r| bots.role_of(r.author.as_deref()))
            .collect();
        Self { snapshot, roles }
    }

    fn has_open_threads(&self) -> bool {
        self.snapshot.threads.iter().any(|t| t.needs_attention())
    }

    fn last_index_of(&self, role: ReviewerRole) -> Option<usize> {
        self.roles.iter().rposition(|r| *r == role)
    }

    fn first_index_of(&self, role: ReviewerRole) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }

    fn count_of(&self, role: ReviewerRole) -> usize {
        self.roles.iter().filter(|r| **r == role).count()
    }
}

/// One row of the decision table
pub struct Rule {
    /// Short name, reported in debug logs
    pub name: &'static str,
    apply: fn(&Facts<'_>) -> Option<Phase>,
}

/// The decision table, in precedence order
pub const RULES: &[Rule] = &[
    Rule {
        name: "reacted-comment",
        apply: reacted_comment,
    },
    Rule {
        name: "draft",
        apply: draft,
    },
    Rule {
        name: "no-reviews",
        apply: no_reviews,
    },
    Rule {
        name: "latest-review",
        apply: latest_review,
    },
];

/// A reaction on a general comment means the agent picked it up.
fn reacted_comment(facts: &Facts<'_>) -> Option<Phase> {
    facts
        .snapshot
        .comments
        .iter()
        .any(|c| c.reaction_count > 0)
        .then_some(Phase::AgentWorking)
}

fn draft(facts: &Facts<'_>) -> Option<Phase> {
    if !facts.snapshot.is_draft {
        return None;
    }
    if facts.snapshot.requested_reviewers.is_empty() {
        Some(Phase::AgentWorking)
    } else {
        Some(Phase::Draft)
    }
}

fn no_reviews(facts: &Facts<'_>) -> Option<Phase> {
    (facts.snapshot.reviews.is_empty() || facts.snapshot.latest_reviews.is_empty())
        .then_some(Phase::AgentWorking)
}

fn latest_review(facts: &Facts<'_>) -> Option<Phase> {
    let latest = facts.snapshot.reviews.last()?;
    let role = *facts.roles.last()?;

    let phase = match role {
        ReviewerRole::ReviewerBot => match latest.state {
            ReviewState::ChangesRequested => Phase::NeedsFix,
            ReviewState::Commented if facts.has_open_threads() => Phase::NeedsFix,
            _ => Phase::ReadyForReview,
        },
        ReviewerRole::AgentBot => after_agent_review(facts),
        ReviewerRole::Other => Phase::AgentWorking,
    };
    Some(phase)
}

/// The agent spoke last: decide whether its work settled the reviewer's feedback.
///
/// Open threads after a "commented" review are suggestions, not blockers. They
/// only keep the PR in `NeedsFix` until the agent has had one pass at them.
fn after_agent_review(facts: &Facts<'_>) -> Phase {
    let reviewer_idx = facts.last_index_of(ReviewerRole::ReviewerBot);
    let reviewer_state = reviewer_idx.map(|i| facts.snapshot.reviews[i].state);

    if reviewer_state == Some(ReviewState::ChangesRequested) {
        return Phase::NeedsFix;
    }
    if !facts.has_open_threads() {
        return Phase::ReadyForReview;
    }

    let first_agent_idx = facts.first_index_of(ReviewerRole::AgentBot);
    let re_reviewed = matches!(
        (reviewer_idx, first_agent_idx),
        (Some(reviewer), Some(agent)) if reviewer > agent
    );
    if facts.count_of(ReviewerRole::AgentBot) > 1 || re_reviewed {
        Phase::ReadyForReview
    } else {
        Phase::NeedsFix
    }
}

/// Classify a snapshot into its phase
pub fn classify(snapshot: &PullRequestSnapshot, bots: &BotIdentities) -> Phase {
    classify_with_rule(snapshot, bots).0
}

/// Classify a snapshot, also reporting which rule decided
///
/// Returns `"fallthrough"` when no rule matched.
pub fn classify_with_rule(
    snapshot: &PullRequestSnapshot,
    bots: &BotIdentities,
) -> (Phase, &'static str) {
    let facts = Facts::new(snapshot, bots);
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(&facts).map(|phase| (phase, rule.name)))
        .unwrap_or((Phase::AgentWorking, "fallthrough"))
}
