//! The polling loop: fetch, classify, dispatch, record, wait

use super::dispatch::{
    DispatchSettings, ExecutionReport, PlannedAction, execute_actions, plan_issue_assignments,
    plan_pr_actions,
};
use super::guards::DispatchGuards;
use super::state::{Fingerprint, FrequencyMode, ModeChange, MonitoringState};
use crate::config::duration::format_duration;
use crate::config::{
    Config, ConfigWatcher, EffectiveConfig, MAX_INTERVAL, resolve_strict, validate_repository,
};
use crate::error::{Error, Result};
use crate::phase::{Phase, classify_with_rule};
use crate::platform::{ActionDispatcher, SnapshotSource};
use crate::types::{IssueSnapshot, PullRequestSnapshot, RepoRef};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How often the config file is checked during a wait
pub const RELOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether the loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Wait, then run another cycle
    Continue,
    /// Stop with this exit code
    Exit(i32),
}

/// One classified pull request
#[derive(Debug, Clone)]
pub struct CycleEntry {
    /// The snapshot
    pub pr: PullRequestSnapshot,
    /// Its phase
    pub phase: Phase,
    /// Decision-table rule that produced the phase
    pub rule: &'static str,
    /// Time spent in the phase, once past the display threshold
    pub dwell: Option<Duration>,
}

/// What a cycle saw and did
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle start
    pub at: DateTime<Utc>,
    /// Classified PRs, in fetch order
    pub entries: Vec<CycleEntry>,
    /// Open issues, truncated to the display limit
    pub issues: Vec<IssueSnapshot>,
    /// Issues left out by the display limit
    pub hidden_issues: usize,
    /// Actions performed or reported
    pub actions: ExecutionReport,
    /// Frequency mode after this cycle
    pub mode: FrequencyMode,
    /// Mode transition caused by this cycle
    pub mode_change: ModeChange,
    /// Whether to keep going
    pub outcome: CycleOutcome,
}

/// Progress hooks for the console
pub trait Reporter {
    /// A cycle finished
    fn on_cycle(&mut self, _report: &CycleReport) {}

    /// Called about once per second while waiting
    fn on_wait_tick(&mut self, _remaining: Duration) {}

    /// The wait ended (elapsed, reloaded or interrupted)
    fn on_wait_end(&mut self) {}
}

/// Reporter that shows nothing
#[derive(Debug, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Monitoring session: owns the collaborators and all mutable state
pub struct Monitor<S, D> {
    source: S,
    dispatcher: D,
    config: Config,
    /// Configured interval; only a config reload writes it
    base_interval: Duration,
    state: MonitoringState,
    guards: DispatchGuards,
    consecutive_failures: u32,
    /// Repositories seen in the last successful cycle
    known_repos: BTreeSet<RepoRef>,
}

impl<S: SnapshotSource, D: ActionDispatcher> Monitor<S, D> {
    /// Start a session with fresh state
    pub fn new(source: S, dispatcher: D, config: Config) -> Self {
        Self {
            source,
            dispatcher,
            base_interval: config.interval,
            config,
            state: MonitoringState::new(),
            guards: DispatchGuards::new(),
            consecutive_failures: 0,
            known_repos: BTreeSet::new(),
        }
    }

    /// The snapshot source
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The action dispatcher
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Active configuration
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Session state
    pub const fn state(&self) -> &MonitoringState {
        &self.state
    }

    /// Failed cycles since the last successful one
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Configured base interval
    pub const fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Wait before the next cycle, chosen by the current mode
    pub const fn next_interval(&self) -> Duration {
        match self.state.mode() {
            FrequencyMode::Normal => self.base_interval,
            FrequencyMode::Reduced => self.config.reduced_frequency_interval,
        }
    }

    fn record_failure(&mut self, err: Error) -> Error {
        if err.is_fatal() {
            return err;
        }
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.config.max_consecutive_failures {
            return Error::RetryLimit {
                failures: self.consecutive_failures,
                last: err.to_string(),
            };
        }
        err
    }

    /// Resolve and validate every repository strictly
    fn resolve_all<'a>(
        config: &Config,
        repos: impl IntoIterator<Item = &'a RepoRef>,
    ) -> Result<HashMap<RepoRef, EffectiveConfig>> {
        let global = config.global();
        repos
            .into_iter()
            .map(|repo| {
                let effective = resolve_strict(&global, &config.rulesets, repo)?;
                validate_repository(&effective, repo)?;
                Ok((repo.clone(), effective))
            })
            .collect()
    }

    /// Run one polling cycle at `now`
    ///
    /// A failed PR fetch leaves the session state untouched. Errors that are
    /// [`Error::is_fatal`] should end the session; others mean "try again
    /// next interval".
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let prs = match self.source.fetch_pull_requests().await {
            Ok(prs) => prs,
            Err(e) => return Err(self.record_failure(e)),
        };
        self.consecutive_failures = 0;

        let issues = self.source.fetch_issues().await.unwrap_or_else(|e| {
            warn!(error = %e, "issue fetch failed, continuing without issues");
            Vec::new()
        });

        let repos: BTreeSet<RepoRef> = prs
            .iter()
            .map(|pr| pr.repo.clone())
            .chain(issues.iter().map(|i| i.repo.clone()))
            .collect();
        let effective = Self::resolve_all(&self.config, &repos)?;

        let classified: Vec<(PullRequestSnapshot, Phase, &'static str)> = prs
            .into_iter()
            .map(|pr| {
                let (phase, rule) = classify_with_rule(&pr, &self.config.bots);
                debug!(url = %pr.url, %phase, rule, "classified");
                (pr, phase, rule)
            })
            .collect();

        let settings = DispatchSettings {
            open_browser: self.config.open_browser,
            notifications_available: self.config.ntfy.is_some(),
            fix_request_comment: self.config.fix_request_comment.clone(),
        };
        let mut planned: Vec<PlannedAction> = Vec::new();
        for (pr, phase, _) in &classified {
            if let Some(eff) = effective.get(&pr.repo) {
                planned.extend(plan_pr_actions(pr, *phase, eff, &settings, &self.guards));
            }
        }
        let repos_with_prs: HashSet<RepoRef> =
            classified.iter().map(|(pr, _, _)| pr.repo.clone()).collect();
        planned.extend(plan_issue_assignments(
            &issues,
            &repos_with_prs,
            &effective,
            &self.guards,
            now,
        ));

        let actions = execute_actions(&planned, &self.dispatcher, &mut self.guards, now).await;

        let fingerprint: Fingerprint = classified
            .iter()
            .map(|(pr, phase, _)| (pr.url.clone(), *phase))
            .collect();
        let mode_change = self
            .state
            .observe(&fingerprint, now, self.config.no_change_timeout);
        match mode_change {
            ModeChange::Throttled => info!(
                interval = %format_duration(self.config.reduced_frequency_interval),
                "no changes, reducing polling frequency"
            ),
            ModeChange::Restored => info!("changes detected, returning to normal polling"),
            ModeChange::None => {}
        }
        self.state.record_first_seen(&fingerprint, now);
        self.guards.prune_visits(&fingerprint);
        self.known_repos = repos;

        let phases: Vec<Phase> = classified.iter().map(|(_, phase, _)| *phase).collect();
        let outcome = if self
            .state
            .all_terminal_expired(&phases, now, self.config.all_phase3_timeout)
        {
            info!("every pull request has been ready for review past the timeout, stopping");
            CycleOutcome::Exit(0)
        } else {
            CycleOutcome::Continue
        };

        let threshold = self.config.elapsed_display_threshold;
        let entries = classified
            .into_iter()
            .map(|(pr, phase, rule)| {
                let dwell = self
                    .state
                    .dwell(&pr.url, phase, now)
                    .filter(|d| *d >= threshold);
                CycleEntry {
                    pr,
                    phase,
                    rule,
                    dwell,
                }
            })
            .collect();

        let limit = self.config.issue_display_limit;
        let hidden_issues = issues.len().saturating_sub(limit);
        let issues = issues.into_iter().take(limit).collect();

        Ok(CycleReport {
            at: now,
            entries,
            issues,
            hidden_issues,
            actions,
            mode: self.state.mode(),
            mode_change,
            outcome,
        })
    }

    /// Adopt a reloaded configuration
    ///
    /// Rejected (and the current config kept) if it fails strict resolution
    /// for any repository seen in the last cycle.
    pub fn try_apply_config(&mut self, config: Config) -> Result<()> {
        Self::resolve_all(&config, &self.known_repos)?;
        self.base_interval = config.interval;
        self.config = config;
        self.dispatcher.on_config_reload(&self.config);
        Ok(())
    }

    /// Sleep for `duration`, checking the config file once per second
    ///
    /// Returns early when a reload was applied.
    async fn wait<R: Reporter>(
        &mut self,
        duration: Duration,
        watcher: &mut ConfigWatcher,
        reporter: &mut R,
    ) {
        let start = Instant::now();
        let deadline = start
            .checked_add(duration)
            .unwrap_or_else(|| start + MAX_INTERVAL);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            reporter.on_wait_tick(remaining);
            tokio::time::sleep(remaining.min(RELOAD_POLL_INTERVAL)).await;

            if let Some(config) = watcher.poll() {
                match self.try_apply_config(config) {
                    Ok(()) => {
                        info!(
                            interval = %format_duration(self.base_interval),
                            "applied reloaded configuration"
                        );
                        break;
                    }
                    Err(e) => warn!(error = %e, "rejected reloaded configuration"),
                }
            }
        }
        reporter.on_wait_end();
    }

    /// Run cycles until a stop condition, returning the exit code
    ///
    /// `shutdown` resolving interrupts a cycle or wait immediately. With
    /// `once`, a single cycle runs and any failure is returned.
    pub async fn run<R, F>(
        &mut self,
        watcher: &mut ConfigWatcher,
        reporter: &mut R,
        shutdown: F,
        once: bool,
    ) -> Result<i32>
    where
        R: Reporter,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let result = tokio::select! {
                biased;
                () = &mut shutdown => None,
                result = self.run_cycle(Utc::now()) => Some(result),
            };
            let Some(result) = result else {
                info!("interrupted, shutting down");
                return Ok(0);
            };

            match result {
                Ok(report) => {
                    reporter.on_cycle(&report);
                    if let CycleOutcome::Exit(code) = report.outcome {
                        return Ok(code);
                    }
                }
                Err(e) if e.is_fatal() || once => return Err(e),
                Err(e) => warn!(
                    error = %e,
                    failures = self.consecutive_failures,
                    "cycle failed, retrying next interval"
                ),
            }

            if once {
                return Ok(0);
            }

            let interval = self.next_interval();
            debug!(secs = interval.as_secs(), mode = ?self.state.mode(), "waiting");
            let interrupted = tokio::select! {
                biased;
                () = &mut shutdown => true,
                () = self.wait(interval, watcher, reporter) => false,
            };
            if interrupted {
                reporter.on_wait_end();
                info!("interrupted, shutting down");
                return Ok(0);
            }
        }
    }
}
