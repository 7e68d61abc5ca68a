//! Configuration document, per-repository rulesets, and hot reload
//!
//! The document is TOML. Typed settings are deserialized with serde; the
//! top-level default flags and the `[[rulesets]]` entries stay as raw
//! `toml::Value`s so the resolver can tell "absent" from "false" and skip
//! malformed rules instead of rejecting the whole file.

pub mod duration;
mod reload;
mod ruleset;

pub use reload::ConfigWatcher;
pub use ruleset::{
    EffectiveConfig, ExecutionFlags, Flag, GlobalConfig, ruleset_matches, resolve,
    resolve_strict, validate_repository,
};

use crate::error::{Error, Result};
use crate::phase::BotIdentities;
use crate::types::MergeMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform config dir
const CONFIG_DIR: &str = "pr-phase-monitor";

/// Config filename
const CONFIG_FILE: &str = "config.toml";

/// Upper bound for polling intervals
pub const MAX_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Comment posted to ask the agent to address review feedback
pub const DEFAULT_FIX_REQUEST_COMMENT: &str =
    "@copilot apply changes based on the comments in this thread";

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_reduced_interval() -> Duration {
    Duration::from_secs(3_600)
}

fn default_elapsed_display_threshold() -> Duration {
    Duration::from_secs(10 * 60)
}

const fn default_issue_display_limit() -> usize {
    10
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_fix_request_comment() -> String {
    DEFAULT_FIX_REQUEST_COMMENT.to_string()
}

fn default_ntfy_server() -> String {
    "https://ntfy.sh".to_string()
}

const fn default_ntfy_priority() -> u8 {
    4
}

fn default_assign_label() -> String {
    "good first issue".to_string()
}

const fn default_true() -> bool {
    true
}

/// Settings for merging pull requests that reached the terminal phase
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Whether auto-merge is considered at all (rules may override)
    pub enabled: bool,
    /// Comment posted right before merging; required when enabled
    pub comment: String,
    /// Merge method
    pub method: MergeMethod,
}

/// Settings for assigning issues to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignSettings {
    /// Whether auto-assignment is considered at all (rules may override)
    pub enabled: bool,
    /// Only issues with this label are candidates
    pub label: String,
    /// Pick the oldest candidate rather than the newest
    pub oldest_first: bool,
}

impl Default for AssignSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            label: default_assign_label(),
            oldest_first: true,
        }
    }
}

/// Push-notification settings (ntfy.sh compatible)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtfySettings {
    /// Topic to publish to
    pub topic: String,
    /// Server base URL
    #[serde(default = "default_ntfy_server")]
    pub server: String,
    /// Message priority (1-5)
    #[serde(default = "default_ntfy_priority")]
    pub priority: u8,
}

/// The whole configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base polling interval
    #[serde(default = "default_interval", deserialize_with = "duration::deserialize")]
    pub interval: Duration,

    /// Polling interval while in reduced-frequency mode
    #[serde(
        default = "default_reduced_interval",
        deserialize_with = "duration::deserialize"
    )]
    pub reduced_frequency_interval: Duration,

    /// How long the aggregate state may stay unchanged before throttling
    ///
    /// Absent or empty disables throttling.
    #[serde(default, deserialize_with = "duration::deserialize_optional")]
    pub no_change_timeout: Option<Duration>,

    /// Exit once every PR has been ready for review this long
    #[serde(default, deserialize_with = "duration::deserialize_optional")]
    pub all_phase3_timeout: Option<Duration>,

    /// Dwell time after which a PR's elapsed time is shown
    #[serde(
        default = "default_elapsed_display_threshold",
        deserialize_with = "duration::deserialize"
    )]
    pub elapsed_display_threshold: Duration,

    /// Maximum number of issues listed per cycle
    #[serde(default = "default_issue_display_limit")]
    pub issue_display_limit: usize,

    /// Consecutive failed cycles before giving up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Owners (users or organizations) whose repositories are watched
    ///
    /// Empty means the authenticated user.
    #[serde(default)]
    pub owners: Vec<String>,

    /// Whether to open ready PRs in the browser
    #[serde(default = "default_true")]
    pub open_browser: bool,

    /// Comment posted to ask the agent for fixes
    #[serde(default = "default_fix_request_comment")]
    pub fix_request_comment: String,

    /// Identities of the reviewer and agent bots
    #[serde(default)]
    pub bots: BotIdentities,

    /// Notification settings; notifications are off without them
    #[serde(default)]
    pub ntfy: Option<NtfySettings>,

    /// Default merge settings
    #[serde(default)]
    pub phase3_merge: MergeSettings,

    /// Default issue-assignment settings
    #[serde(default)]
    pub assign_to_copilot: AssignSettings,

    /// Ordered override rules
    #[serde(default)]
    pub rulesets: Vec<toml::Value>,

    /// Everything else at top level: the default execution flags
    #[serde(flatten)]
    pub defaults: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            reduced_frequency_interval: default_reduced_interval(),
            no_change_timeout: None,
            all_phase3_timeout: None,
            elapsed_display_threshold: default_elapsed_display_threshold(),
            issue_display_limit: default_issue_display_limit(),
            max_consecutive_failures: default_max_consecutive_failures(),
            owners: Vec::new(),
            open_browser: true,
            fix_request_comment: default_fix_request_comment(),
            bots: BotIdentities::default(),
            ntfy: None,
            phase3_merge: MergeSettings::default(),
            assign_to_copilot: AssignSettings::default(),
            rulesets: Vec::new(),
            defaults: toml::Table::new(),
        }
    }
}

impl Config {
    /// Parse a configuration document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from disk
    ///
    /// Returns the built-in defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Global defaults the rulesets are folded over
    pub fn global(&self) -> GlobalConfig {
        GlobalConfig {
            flags: self.defaults.clone(),
            merge: self.phase3_merge.clone(),
            assign: self.assign_to_copilot.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::Config("interval must be greater than zero".to_string()));
        }
        if self.reduced_frequency_interval.is_zero() {
            return Err(Error::Config(
                "reduced_frequency_interval must be greater than zero".to_string(),
            ));
        }
        for (key, value) in [
            ("interval", self.interval),
            ("reduced_frequency_interval", self.reduced_frequency_interval),
        ] {
            if value > MAX_INTERVAL {
                return Err(Error::Config(format!(
                    "{key} must be at most {}",
                    duration::format_duration(MAX_INTERVAL)
                )));
            }
        }
        if let Some(ntfy) = &self.ntfy
            && ntfy.topic.trim().is_empty()
        {
            return Err(Error::Config("ntfy.topic must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default config path (`<config dir>/pr-phase-monitor/config.toml`)
///
/// Falls back to the working directory when no config dir is known.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir().map_or_else(
        || PathBuf::from(CONFIG_FILE),
        |dir| dir.join(CONFIG_DIR).join(CONFIG_FILE),
    )
}
