//! Phase actions: pure planning, effectful execution
//!
//! Two-step pattern:
//! 1. Plan - decide which actions a PR (or issue) needs right now (pure)
//! 2. Execute - perform live actions, report dry-run ones (effectful)

use super::guards::{DispatchGuards, GuardKind};
use crate::config::EffectiveConfig;
use crate::phase::Phase;
use crate::platform::ActionDispatcher;
use crate::types::{IssueSnapshot, MergeMethod, PullRequestSnapshot, RepoRef};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Settings that apply to every repository
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Open ready PRs in the browser
    pub open_browser: bool,
    /// Notifications are configured at all
    pub notifications_available: bool,
    /// Comment asking the agent for fixes
    pub fix_request_comment: String,
}

/// A single side effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    /// Mark a draft ready for review
    MarkReady {
        /// PR URL
        url: String,
    },
    /// Ask the agent to address feedback
    RequestFix {
        /// PR URL
        url: String,
        /// Comment text
        comment: String,
    },
    /// Open a PR in the browser
    OpenBrowser {
        /// PR URL
        url: String,
    },
    /// Send a push notification
    Notify {
        /// PR URL
        url: String,
        /// PR title
        title: String,
    },
    /// Comment posted right before merging
    MergeComment {
        /// PR URL
        url: String,
        /// Comment text
        comment: String,
    },
    /// Merge a PR
    Merge {
        /// PR URL
        url: String,
        /// Merge method
        method: MergeMethod,
    },
    /// Assign an issue to the agent
    AssignIssue {
        /// The issue
        issue: IssueSnapshot,
    },
}

impl ActionStep {
    /// URL the action targets
    pub fn url(&self) -> &str {
        match self {
            Self::MarkReady { url }
            | Self::RequestFix { url, .. }
            | Self::OpenBrowser { url }
            | Self::Notify { url, .. }
            | Self::MergeComment { url, .. }
            | Self::Merge { url, .. } => url,
            Self::AssignIssue { issue } => &issue.url,
        }
    }

    /// Guard recording this action, if it has a one-shot guard
    pub const fn guard(&self) -> Option<GuardKind> {
        match self {
            Self::MarkReady { .. } => Some(GuardKind::MarkReady),
            Self::RequestFix { .. } => Some(GuardKind::FixRequest),
            Self::OpenBrowser { .. } => Some(GuardKind::Browser),
            Self::Notify { .. } => Some(GuardKind::Notification),
            Self::MergeComment { .. } => Some(GuardKind::MergeComment),
            Self::Merge { .. } => Some(GuardKind::Merge),
            Self::AssignIssue { .. } => None,
        }
    }

    /// Key under which a dry-run of this action is announced
    ///
    /// Assignment has no one-shot guard (it retries on a window), but its
    /// dry-run is still reported once.
    pub const fn announce_kind(&self) -> GuardKind {
        match self.guard() {
            Some(kind) => kind,
            None => GuardKind::Assign,
        }
    }

    /// Whether the action shares the global browser cooldown
    pub const fn uses_browser(&self) -> bool {
        matches!(self, Self::OpenBrowser { .. } | Self::AssignIssue { .. })
    }
}

impl std::fmt::Display for ActionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkReady { url } => write!(f, "mark ready for review: {url}"),
            Self::RequestFix { url, .. } => write!(f, "request fixes: {url}"),
            Self::OpenBrowser { url } => write!(f, "open in browser: {url}"),
            Self::Notify { url, .. } => write!(f, "notify: {url}"),
            Self::MergeComment { url, .. } => write!(f, "post merge comment: {url}"),
            Self::Merge { url, method } => write!(f, "merge ({method}): {url}"),
            Self::AssignIssue { issue } => {
                write!(f, "assign issue #{} ({}): {}", issue.number, issue.repo, issue.url)
            }
        }
    }
}

/// An action with the phase it belongs to and whether it runs for real
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    /// The action
    pub step: ActionStep,
    /// Phase the PR was in when planned
    pub phase: Phase,
    /// `false` means dry-run
    pub live: bool,
}

/// Plan the actions for one classified PR (PURE)
///
/// Actions whose guard is already set are left out.
pub fn plan_pr_actions(
    pr: &PullRequestSnapshot,
    phase: Phase,
    effective: &EffectiveConfig,
    settings: &DispatchSettings,
    guards: &DispatchGuards,
) -> Vec<PlannedAction> {
    let url = pr.url.clone();
    let mut steps: Vec<(ActionStep, bool)> = Vec::new();

    match phase {
        Phase::Draft => {
            steps.push((ActionStep::MarkReady { url }, effective.flags.mark_ready));
        }
        Phase::NeedsFix => {
            steps.push((
                ActionStep::RequestFix {
                    url,
                    comment: settings.fix_request_comment.clone(),
                },
                effective.flags.request_fix,
            ));
        }
        Phase::ReadyForReview => {
            if settings.open_browser {
                steps.push((ActionStep::OpenBrowser { url: url.clone() }, true));
            }
            if settings.notifications_available {
                steps.push((
                    ActionStep::Notify {
                        url: url.clone(),
                        title: pr.title.clone(),
                    },
                    effective.flags.notify,
                ));
            }
            if effective.merge.enabled {
                steps.push((
                    ActionStep::MergeComment {
                        url: url.clone(),
                        comment: effective.merge.comment.clone(),
                    },
                    effective.flags.merge,
                ));
                steps.push((
                    ActionStep::Merge {
                        url,
                        method: effective.merge.method,
                    },
                    effective.flags.merge,
                ));
            }
        }
        Phase::AgentWorking => {}
    }

    steps
        .into_iter()
        .filter(|(step, _)| {
            step.guard()
                .is_none_or(|kind| !guards.is_done(kind, step.url(), phase))
        })
        .map(|(step, live)| PlannedAction { step, phase, live })
        .collect()
}

/// Plan issue assignments (PURE)
///
/// A repository gets at most one assignment per cycle, and only while it has
/// no open PRs being tracked. Candidates carry the configured label and have
/// no assignee yet.
pub fn plan_issue_assignments(
    issues: &[IssueSnapshot],
    repos_with_prs: &HashSet<RepoRef>,
    effective: &HashMap<RepoRef, EffectiveConfig>,
    guards: &DispatchGuards,
    now: DateTime<Utc>,
) -> Vec<PlannedAction> {
    let mut by_repo: HashMap<&RepoRef, Vec<&IssueSnapshot>> = HashMap::new();
    for issue in issues {
        if !repos_with_prs.contains(&issue.repo) {
            by_repo.entry(&issue.repo).or_default().push(issue);
        }
    }

    let mut repos: Vec<_> = by_repo.into_iter().collect();
    repos.sort_by(|a, b| a.0.cmp(b.0));

    repos
        .into_iter()
        .filter_map(|(repo, candidates)| {
            let effective = effective.get(repo).filter(|e| e.assign.enabled)?;
            let mut candidates: Vec<_> = candidates
                .into_iter()
                .filter(|i| i.assignees.is_empty())
                .filter(|i| i.has_label(&effective.assign.label))
                .filter(|i| guards.assign_allowed(&i.url, now))
                .collect();
            candidates.sort_by_key(|i| i.created_at);
            let pick = if effective.assign.oldest_first {
                candidates.first()
            } else {
                candidates.last()
            }?;
            Some(PlannedAction {
                step: ActionStep::AssignIssue {
                    issue: (*pick).clone(),
                },
                // Issues have no phase of their own
                phase: Phase::AgentWorking,
                live: effective.flags.assign,
            })
        })
        .collect()
}

/// Outcome of executing a batch of planned actions
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Live actions that succeeded
    pub executed: Vec<ActionStep>,
    /// Dry-run actions (reported, not performed)
    pub dry_run: Vec<ActionStep>,
    /// Live actions that failed, with the error message
    pub failed: Vec<(ActionStep, String)>,
    /// Live actions postponed by the browser cooldown
    pub deferred: Vec<ActionStep>,
}

impl ExecutionReport {
    /// Whether nothing was attempted
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
            && self.dry_run.is_empty()
            && self.failed.is_empty()
            && self.deferred.is_empty()
    }
}

async fn perform(step: &ActionStep, dispatcher: &dyn ActionDispatcher) -> crate::error::Result<()> {
    match step {
        ActionStep::MarkReady { url } => dispatcher.mark_ready(url).await,
        ActionStep::RequestFix { url, comment } | ActionStep::MergeComment { url, comment } => {
            dispatcher.post_comment(url, comment).await
        }
        ActionStep::OpenBrowser { url } => dispatcher.open(url).await,
        ActionStep::Notify { url, title } => dispatcher.send_notification(url, title).await,
        ActionStep::Merge { url, method } => dispatcher.merge(url, *method).await,
        ActionStep::AssignIssue { issue } => dispatcher.assign_issue(issue).await,
    }
}

/// Execute planned actions (EFFECTFUL)
///
/// Guards are set only on success, so failures retry next cycle. After a
/// failure, later actions for the same URL are skipped for this cycle (a
/// merge never runs when its comment could not be posted).
pub async fn execute_actions(
    actions: &[PlannedAction],
    dispatcher: &dyn ActionDispatcher,
    guards: &mut DispatchGuards,
    now: DateTime<Utc>,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let mut failed_urls: HashSet<String> = HashSet::new();

    for action in actions {
        let step = &action.step;
        let url = step.url();

        if !action.live {
            if guards.announce_dry_run(step.announce_kind(), url, action.phase) {
                info!(phase = %action.phase, "[dry-run] would {step}");
            }
            report.dry_run.push(step.clone());
            continue;
        }

        if failed_urls.contains(url) {
            debug!(%step, "skipping after earlier failure");
            continue;
        }

        if step.uses_browser() {
            if !guards.browser_ready(now) {
                debug!(%step, "browser cooldown active, deferring");
                report.deferred.push(step.clone());
                continue;
            }
            guards.record_browser_action(now);
        }
        if let ActionStep::AssignIssue { issue } = step {
            guards.record_assign_attempt(&issue.url, now);
        }

        match perform(step, dispatcher).await {
            Ok(()) => {
                info!(phase = %action.phase, "{step}");
                if let Some(kind) = step.guard() {
                    guards.mark_done(kind, url, action.phase);
                }
                report.executed.push(step.clone());
            }
            Err(e) => {
                warn!(phase = %action.phase, error = %e, "failed to {step}");
                failed_urls.insert(url.to_string());
                report.failed.push((step.clone(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssignSettings, ExecutionFlags, MergeSettings};

    fn pr(url: &str) -> PullRequestSnapshot {
        PullRequestSnapshot {
            url: url.to_string(),
            title: "Add gizmo".to_string(),
            repo: RepoRef::new("acme", "widgets"),
            author: None,
            is_draft: false,
            reviews: Vec::new(),
            latest_reviews: Vec::new(),
            requested_reviewers: Vec::new(),
            comments: Vec::new(),
            threads: Vec::new(),
            created_at: None,
        }
    }

    fn effective(flags: ExecutionFlags, merge_enabled: bool) -> EffectiveConfig {
        EffectiveConfig {
            flags,
            merge: MergeSettings {
                enabled: merge_enabled,
                comment: "Thanks!".to_string(),
                method: MergeMethod::Squash,
            },
            assign: AssignSettings::default(),
        }
    }

    fn settings() -> DispatchSettings {
        DispatchSettings {
            open_browser: true,
            notifications_available: true,
            fix_request_comment: "please fix".to_string(),
        }
    }

    #[test]
    fn test_agent_working_plans_nothing() {
        let planned = plan_pr_actions(
            &pr("u1"),
            Phase::AgentWorking,
            &effective(ExecutionFlags::default(), true),
            &settings(),
            &DispatchGuards::new(),
        );
        assert!(planned.is_empty());
    }

    #[test]
    fn test_ready_plans_in_order_with_liveness() {
        let flags = ExecutionFlags {
            notify: true,
            ..ExecutionFlags::default()
        };
        let planned = plan_pr_actions(
            &pr("u1"),
            Phase::ReadyForReview,
            &effective(flags, true),
            &settings(),
            &DispatchGuards::new(),
        );

        let summary: Vec<_> = planned
            .iter()
            .map(|a| (a.step.guard().unwrap(), a.live))
            .collect();
        assert_eq!(
            summary,
            vec![
                (GuardKind::Browser, true),
                (GuardKind::Notification, true),
                (GuardKind::MergeComment, false),
                (GuardKind::Merge, false),
            ]
        );
    }

    #[test]
    fn test_done_guards_are_filtered() {
        let mut guards = DispatchGuards::new();
        guards.mark_done(GuardKind::Browser, "u1", Phase::ReadyForReview);
        let planned = plan_pr_actions(
            &pr("u1"),
            Phase::ReadyForReview,
            &effective(ExecutionFlags::default(), false),
            &settings(),
            &guards,
        );
        assert_eq!(planned.len(), 1);
        assert!(matches!(planned[0].step, ActionStep::Notify { .. }));
    }

    #[test]
    fn test_needs_fix_uses_configured_comment() {
        let planned = plan_pr_actions(
            &pr("u1"),
            Phase::NeedsFix,
            &effective(ExecutionFlags::default(), false),
            &settings(),
            &DispatchGuards::new(),
        );
        assert_eq!(
            planned[0].step,
            ActionStep::RequestFix {
                url: "u1".to_string(),
                comment: "please fix".to_string(),
            }
        );
        assert!(!planned[0].live);
    }

    fn issue(repo: &str, number: u64, day: i64, label: &str) -> IssueSnapshot {
        IssueSnapshot {
            url: format!("https://github.com/acme/{repo}/issues/{number}"),
            number,
            title: format!("Issue {number}"),
            repo: RepoRef::new("acme", repo),
            labels: vec![label.to_string()],
            assignees: Vec::new(),
            created_at: DateTime::UNIX_EPOCH + chrono::TimeDelta::days(day),
        }
    }

    #[test]
    fn test_assign_picks_oldest_labelled_issue_in_idle_repo() {
        let issues = vec![
            issue("widgets", 3, 5, "good first issue"),
            issue("widgets", 1, 1, "bug"),
            issue("widgets", 2, 2, "good first issue"),
            issue("busy", 4, 0, "good first issue"),
        ];
        let busy: HashSet<_> = [RepoRef::new("acme", "busy")].into();
        let mut enabled = effective(ExecutionFlags::default(), false);
        enabled.assign.enabled = true;
        let resolved: HashMap<_, _> = ["widgets", "busy"]
            .into_iter()
            .map(|name| (RepoRef::new("acme", name), enabled.clone()))
            .collect();

        let planned = plan_issue_assignments(
            &issues,
            &busy,
            &resolved,
            &DispatchGuards::new(),
            DateTime::UNIX_EPOCH,
        );
        assert_eq!(planned.len(), 1);
        assert_eq!(
            planned[0].step,
            ActionStep::AssignIssue {
                issue: issues[2].clone()
            }
        );
        assert_eq!(planned[0].phase, Phase::AgentWorking);
        assert!(!planned[0].live);
    }

    #[test]
    fn test_assign_disabled_plans_nothing() {
        let issues = vec![issue("widgets", 1, 1, "good first issue")];
        let resolved: HashMap<_, _> = [(
            RepoRef::new("acme", "widgets"),
            effective(ExecutionFlags::default(), false),
        )]
        .into();
        let planned = plan_issue_assignments(
            &issues,
            &HashSet::new(),
            &resolved,
            &DispatchGuards::new(),
            DateTime::UNIX_EPOCH,
        );
        assert!(planned.is_empty());
    }
}
