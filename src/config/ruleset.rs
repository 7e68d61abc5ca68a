//! Ruleset resolution - a pure fold over ordered override rules
//!
//! Resolution starts from the global defaults, then walks the rulesets in
//! array order. A ruleset applies when one of its `repositories` patterns
//! matches; every flag it carries overwrites the running value, and flags it
//! leaves out are inherited. Order decides precedence, never flag name.

use super::{AssignSettings, MergeSettings};
use crate::error::{Error, Result};
use crate::types::RepoRef;
use tracing::warn;

/// Key holding a ruleset's repository patterns
const REPOSITORIES_KEY: &str = "repositories";

/// Pattern matching every repository
const WILDCARD: &str = "all";

/// Tri-state key enabling the merge feature
const MERGE_FEATURE_KEY: &str = "enable_phase3_merge";

/// Tri-state key enabling issue assignment
const ASSIGN_FEATURE_KEY: &str = "enable_assign_to_copilot";

/// Boolean execution flags; `false` means dry-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Mark a draft ready for review
    MarkReady,
    /// Post the fix-request comment
    RequestFix,
    /// Send a notification for a ready PR
    Notify,
    /// Merge a ready PR
    Merge,
    /// Assign an issue to the agent
    Assign,
}

impl Flag {
    /// Every flag
    pub const ALL: [Self; 5] = [
        Self::MarkReady,
        Self::RequestFix,
        Self::Notify,
        Self::Merge,
        Self::Assign,
    ];

    /// Config key for this flag
    pub const fn key(self) -> &'static str {
        match self {
            Self::MarkReady => "enable_execution_phase1_to_phase2",
            Self::RequestFix => "enable_execution_phase2_to_phase3",
            Self::Notify => "enable_execution_phase3_send_ntfy",
            Self::Merge => "enable_execution_phase3_to_merge",
            Self::Assign => "enable_execution_assign",
        }
    }
}

/// Resolved execution flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExecutionFlags {
    /// Draft → ready
    pub mark_ready: bool,
    /// Needs-fix → comment
    pub request_fix: bool,
    /// Ready → notify
    pub notify: bool,
    /// Ready → merge
    pub merge: bool,
    /// Issue → assign
    pub assign: bool,
}

impl ExecutionFlags {
    /// Read a flag
    pub const fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::MarkReady => self.mark_ready,
            Flag::RequestFix => self.request_fix,
            Flag::Notify => self.notify,
            Flag::Merge => self.merge,
            Flag::Assign => self.assign,
        }
    }

    /// Write a flag
    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::MarkReady => self.mark_ready = value,
            Flag::RequestFix => self.request_fix = value,
            Flag::Notify => self.notify = value,
            Flag::Merge => self.merge = value,
            Flag::Assign => self.assign = value,
        }
    }
}

/// Global defaults: top-level flags plus the feature settings objects
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Raw top-level table holding the default flags
    pub flags: toml::Table,
    /// Default merge settings
    pub merge: MergeSettings,
    /// Default assignment settings
    pub assign: AssignSettings,
}

/// Per-repository resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Execution flags
    pub flags: ExecutionFlags,
    /// Merge settings with `enabled` resolved
    pub merge: MergeSettings,
    /// Assignment settings with `enabled` resolved
    pub assign: AssignSettings,
}

/// How strictly flag types are checked
#[derive(Clone, Copy, PartialEq, Eq)]
enum Strictness {
    Lenient,
    Strict,
}

/// Read a boolean, distinguishing absent from malformed
fn read_bool(
    table: &toml::Table,
    key: &str,
    context: &str,
    mode: Strictness,
) -> Result<Option<bool>> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => {
            let msg = format!(
                "{context}: '{key}' must be a boolean, got {}",
                other.type_str()
            );
            match mode {
                Strictness::Strict => Err(Error::Config(msg)),
                Strictness::Lenient => {
                    warn!("{msg}; ignoring");
                    Ok(None)
                }
            }
        }
    }
}

/// Whether a ruleset applies to a repository
///
/// Returns `None` for malformed rulesets (not a table, `repositories` not an
/// array). Non-string patterns are skipped.
pub fn ruleset_matches(ruleset: &toml::Value, repo: &RepoRef) -> Option<bool> {
    let table = ruleset.as_table()?;
    let patterns = table.get(REPOSITORIES_KEY)?.as_array()?;
    let full_name = repo.to_string();

    Some(patterns.iter().filter_map(toml::Value::as_str).any(|pattern| {
        let pattern = pattern.trim();
        pattern.eq_ignore_ascii_case(WILDCARD)
            || pattern.eq_ignore_ascii_case(&full_name)
            || pattern.eq_ignore_ascii_case(&repo.name)
    }))
}

fn fold(
    global: &GlobalConfig,
    rulesets: &[toml::Value],
    repo: &RepoRef,
    mode: Strictness,
) -> Result<EffectiveConfig> {
    let mut flags = ExecutionFlags::default();
    for flag in Flag::ALL {
        let value = read_bool(&global.flags, flag.key(), "global config", mode)?;
        flags.set(flag, value.unwrap_or(false));
    }

    let mut merge_enabled: Option<bool> = None;
    let mut assign_enabled: Option<bool> = None;

    for (idx, ruleset) in rulesets.iter().enumerate() {
        if ruleset_matches(ruleset, repo) != Some(true) {
            continue;
        }
        let Some(table) = ruleset.as_table() else {
            continue;
        };
        let context = format!("rulesets[{idx}]");

        for flag in Flag::ALL {
            if let Some(value) = read_bool(table, flag.key(), &context, mode)? {
                flags.set(flag, value);
            }
        }
        if let Some(value) = read_bool(table, MERGE_FEATURE_KEY, &context, mode)? {
            merge_enabled = Some(value);
        }
        if let Some(value) = read_bool(table, ASSIGN_FEATURE_KEY, &context, mode)? {
            assign_enabled = Some(value);
        }
    }

    let mut merge = global.merge.clone();
    merge.enabled = merge_enabled.unwrap_or(global.merge.enabled);
    let mut assign = global.assign.clone();
    assign.enabled = assign_enabled.unwrap_or(global.assign.enabled);

    Ok(EffectiveConfig {
        flags,
        merge,
        assign,
    })
}

/// Resolve the effective config for a repository
///
/// Non-boolean flag values are logged and treated as absent.
pub fn resolve(global: &GlobalConfig, rulesets: &[toml::Value], repo: &RepoRef) -> EffectiveConfig {
    fold(global, rulesets, repo, Strictness::Lenient).unwrap_or_else(|err| {
        warn!(%repo, %err, "ruleset resolution failed, using global defaults");
        EffectiveConfig {
            flags: ExecutionFlags::default(),
            merge: global.merge.clone(),
            assign: global.assign.clone(),
        }
    })
}

/// Resolve the effective config, rejecting non-boolean flags
///
/// Only the global flags and rulesets matching `repo` are checked.
pub fn resolve_strict(
    global: &GlobalConfig,
    rulesets: &[toml::Value],
    repo: &RepoRef,
) -> Result<EffectiveConfig> {
    fold(global, rulesets, repo, Strictness::Strict)
}

/// Fatal checks for a repository's resolved config
pub fn validate_repository(effective: &EffectiveConfig, repo: &RepoRef) -> Result<()> {
    if effective.merge.enabled && effective.merge.comment.trim().is_empty() {
        return Err(Error::Config(format!(
            "{repo}: phase3_merge.comment is required when merge is enabled"
        )));
    }
    Ok(())
}
