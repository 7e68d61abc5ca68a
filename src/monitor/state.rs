//! Session state carried between polling cycles

use crate::phase::Phase;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Every (url, phase) pair seen in one cycle
pub type Fingerprint = BTreeSet<(String, Phase)>;

/// Polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyMode {
    /// Poll at the configured interval
    #[default]
    Normal,
    /// Nothing has changed for a while; poll at the reduced interval
    Reduced,
}

/// What a fingerprint comparison did to the mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// Mode unchanged
    None,
    /// Normal → Reduced
    Throttled,
    /// Reduced → Normal
    Restored,
}

/// Elapsed time between two instants, zero if the clock went backwards
pub fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Mutable state owned by the scheduler
#[derive(Debug, Default)]
pub struct MonitoringState {
    first_seen: HashMap<(String, Phase), DateTime<Utc>>,
    last_fingerprint: Option<(Fingerprint, DateTime<Utc>)>,
    mode: FrequencyMode,
    all_terminal_since: Option<DateTime<Utc>>,
}

impl MonitoringState {
    /// Fresh state: Normal mode, nothing observed
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frequency mode
    pub const fn mode(&self) -> FrequencyMode {
        self.mode
    }

    /// When the current fingerprint was first observed
    pub fn unchanged_since(&self) -> Option<DateTime<Utc>> {
        self.last_fingerprint.as_ref().map(|(_, at)| *at)
    }

    /// Compare this cycle's fingerprint with the last one and adjust the mode
    ///
    /// `no_change_timeout = None` disables throttling and resets the tracker.
    pub fn observe(
        &mut self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
        no_change_timeout: Option<Duration>,
    ) -> ModeChange {
        let Some(timeout) = no_change_timeout else {
            let was_reduced = self.mode == FrequencyMode::Reduced;
            self.last_fingerprint = None;
            self.mode = FrequencyMode::Normal;
            return if was_reduced {
                ModeChange::Restored
            } else {
                ModeChange::None
            };
        };

        match &self.last_fingerprint {
            None => {
                self.last_fingerprint = Some((fingerprint.clone(), now));
                ModeChange::None
            }
            Some((previous, _)) if previous != fingerprint => {
                self.last_fingerprint = Some((fingerprint.clone(), now));
                if self.mode == FrequencyMode::Reduced {
                    self.mode = FrequencyMode::Normal;
                    ModeChange::Restored
                } else {
                    ModeChange::None
                }
            }
            Some((_, since)) => {
                if self.mode == FrequencyMode::Normal && elapsed(*since, now) >= timeout {
                    self.mode = FrequencyMode::Reduced;
                    ModeChange::Throttled
                } else {
                    ModeChange::None
                }
            }
        }
    }

    /// Drop entries outside `fingerprint` and stamp new ones with `now`
    pub fn record_first_seen(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) {
        self.first_seen.retain(|key, _| fingerprint.contains(key));
        for key in fingerprint {
            self.first_seen.entry(key.clone()).or_insert(now);
        }
    }

    /// How long `url` has been in `phase`
    pub fn dwell(&self, url: &str, phase: Phase, now: DateTime<Utc>) -> Option<Duration> {
        self.first_seen
            .get(&(url.to_string(), phase))
            .map(|since| elapsed(*since, now))
    }

    /// Keys currently tracked
    pub fn tracked(&self) -> impl Iterator<Item = &(String, Phase)> {
        self.first_seen.keys()
    }

    /// Track whether every entity sits in the terminal phase
    ///
    /// Returns `true` once that has held continuously for `timeout`. The
    /// timer restarts whenever any entity leaves the terminal phase, and an
    /// empty cycle never counts.
    pub fn all_terminal_expired(
        &mut self,
        phases: &[Phase],
        now: DateTime<Utc>,
        timeout: Option<Duration>,
    ) -> bool {
        let all_terminal = !phases.is_empty() && phases.iter().all(|p| p.is_terminal());
        let Some(timeout) = timeout.filter(|_| all_terminal) else {
            self.all_terminal_since = None;
            return false;
        };
        let since = *self.all_terminal_since.get_or_insert(now);
        elapsed(since, now) >= timeout
    }

    /// When every entity entered the terminal phase, if they all have
    pub const fn all_terminal_since(&self) -> Option<DateTime<Utc>> {
        self.all_terminal_since
    }
}
