//! Adaptive polling loop and the session state it carries
//!
//! Each cycle fetches snapshots, classifies them, dispatches the actions each
//! phase calls for, then records what it saw. The recorded fingerprint drives
//! the polling frequency: an unchanged fingerprint past `no_change_timeout`
//! switches to the reduced interval until something changes again.

mod dispatch;
mod guards;
mod scheduler;
mod state;

pub use dispatch::{
    ActionStep, DispatchSettings, ExecutionReport, PlannedAction, execute_actions,
    plan_issue_assignments, plan_pr_actions,
};
pub use guards::{ASSIGN_RETRY_WINDOW, BROWSER_COOLDOWN, DispatchGuards, GuardKind};
pub use scheduler::{
    CycleEntry, CycleOutcome, CycleReport, Monitor, NoopReporter, RELOAD_POLL_INTERVAL, Reporter,
};
pub use state::{Fingerprint, FrequencyMode, ModeChange, MonitoringState, elapsed};
