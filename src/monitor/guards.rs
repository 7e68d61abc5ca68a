//! Dispatch guards: one-shot and cooldown records for side effects

use super::state::{Fingerprint, elapsed};
use crate::phase::Phase;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Minimum gap between any two browser-opening actions
pub const BROWSER_COOLDOWN: Duration = Duration::from_secs(60);

/// Per-issue window before an assignment is retried
pub const ASSIGN_RETRY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Kinds of one-shot side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardKind {
    /// PR opened in the browser (process lifetime)
    Browser,
    /// Notification sent (process lifetime)
    Notification,
    /// Merge comment posted (process lifetime)
    MergeComment,
    /// PR merged (process lifetime)
    Merge,
    /// Fix request posted (until the PR leaves the phase)
    FixRequest,
    /// Draft marked ready (until the PR leaves the phase)
    MarkReady,
    /// Issue assignment; only dry-run announcements are keyed on it
    Assign,
}

impl GuardKind {
    /// Whether the guard is cleared when the PR leaves the phase
    ///
    /// A PR can go through several review rounds, so a fix request is due
    /// again each time it re-enters `NeedsFix`.
    pub const fn per_visit(self) -> bool {
        matches!(self, Self::FixRequest | Self::MarkReady)
    }
}

type GuardKey = (GuardKind, String, Phase);

/// Records of side effects already performed
#[derive(Debug, Default)]
pub struct DispatchGuards {
    done: HashSet<GuardKey>,
    dry_run_announced: HashSet<GuardKey>,
    assign_attempts: HashMap<String, DateTime<Utc>>,
    last_browser_action: Option<DateTime<Utc>>,
}

impl DispatchGuards {
    /// Empty guards
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: GuardKind, url: &str, phase: Phase) -> GuardKey {
        (kind, url.to_string(), phase)
    }

    /// Whether the action was already performed
    pub fn is_done(&self, kind: GuardKind, url: &str, phase: Phase) -> bool {
        self.done.contains(&Self::key(kind, url, phase))
    }

    /// Record a successful action
    pub fn mark_done(&mut self, kind: GuardKind, url: &str, phase: Phase) {
        self.done.insert(Self::key(kind, url, phase));
    }

    /// Record that a dry-run was reported; returns `true` the first time
    pub fn announce_dry_run(&mut self, kind: GuardKind, url: &str, phase: Phase) -> bool {
        self.dry_run_announced.insert(Self::key(kind, url, phase))
    }

    /// Whether the global browser cooldown has passed
    pub fn browser_ready(&self, now: DateTime<Utc>) -> bool {
        self.last_browser_action
            .is_none_or(|at| elapsed(at, now) >= BROWSER_COOLDOWN)
    }

    /// Start the browser cooldown
    pub const fn record_browser_action(&mut self, now: DateTime<Utc>) {
        self.last_browser_action = Some(now);
    }

    /// Whether an issue may be (re)tried
    pub fn assign_allowed(&self, url: &str, now: DateTime<Utc>) -> bool {
        self.assign_attempts
            .get(url)
            .is_none_or(|at| elapsed(*at, now) >= ASSIGN_RETRY_WINDOW)
    }

    /// Start an issue's retry window
    pub fn record_assign_attempt(&mut self, url: &str, now: DateTime<Utc>) {
        self.assign_attempts.insert(url.to_string(), now);
    }

    /// Clear per-visit guards for PRs no longer in that phase
    pub fn prune_visits(&mut self, fingerprint: &Fingerprint) {
        let keep = |(kind, url, phase): &GuardKey| {
            !kind.per_visit() || fingerprint.contains(&(url.clone(), *phase))
        };
        self.done.retain(keep);
        self.dry_run_announced.retain(keep);
    }
}
