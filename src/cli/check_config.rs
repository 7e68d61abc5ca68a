//! Check-config command - validate the configuration offline

use crate::cli::context::load_config;
use crate::cli::style::{Stylize, check};
use anstream::println;
use pr_phase_monitor::config::{
    Config, EffectiveConfig, Flag, duration::format_duration, resolve_strict, validate_repository,
};
use pr_phase_monitor::error::Result;
use pr_phase_monitor::types::RepoRef;
use std::collections::BTreeSet;
use std::path::Path;

/// Placeholder owner for patterns that name only a repository
const ANY_OWNER: &str = "*";

/// Repositories named by the rulesets' patterns
///
/// `all` names no repository; bare names get a wildcard owner.
pub fn named_repositories(config: &Config) -> BTreeSet<RepoRef> {
    config
        .rulesets
        .iter()
        .filter_map(|rule| rule.get("repositories")?.as_array())
        .flatten()
        .filter_map(toml::Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("all"))
        .map(|p| match p.split_once('/') {
            Some((owner, name)) => RepoRef::new(owner, name),
            None => RepoRef::new(ANY_OWNER, p),
        })
        .collect()
}

fn print_effective(label: &str, effective: &EffectiveConfig) {
    println!("{}", label.emphasis());
    for flag in Flag::ALL {
        let value = if effective.flags.get(flag) {
            "live".success()
        } else {
            "dry-run".muted()
        };
        println!("  {:<36} {value}", flag.key());
    }
    println!(
        "  {:<36} {}",
        "phase3_merge",
        if effective.merge.enabled {
            format!("enabled ({})", effective.merge.method).success()
        } else {
            "disabled".muted()
        }
    );
    println!(
        "  {:<36} {}",
        "assign_to_copilot",
        if effective.assign.enabled {
            format!("enabled (label '{}')", effective.assign.label).success()
        } else {
            "disabled".muted()
        }
    );
}

/// Run the check-config command
pub fn run_check_config(config_path: Option<&Path>) -> Result<u8> {
    let (watcher, config) = load_config(config_path)?;
    let global = config.global();

    println!(
        "{} {}",
        "Configuration:".emphasis(),
        watcher.path().display().accent()
    );
    println!(
        "  interval {} / reduced {} / no-change timeout {}",
        format_duration(config.interval).accent(),
        format_duration(config.reduced_frequency_interval).accent(),
        config
            .no_change_timeout
            .map_or_else(|| "disabled".to_string(), format_duration)
            .accent()
    );
    println!();

    let unmatched = RepoRef::new(ANY_OWNER, ANY_OWNER);
    let defaults = resolve_strict(&global, &config.rulesets, &unmatched)?;
    validate_repository(&defaults, &unmatched)?;
    print_effective("Other repositories", &defaults);

    for repo in named_repositories(&config) {
        let effective = resolve_strict(&global, &config.rulesets, &repo)?;
        validate_repository(&effective, &repo)?;
        println!();
        print_effective(&repo.to_string(), &effective);
    }

    println!();
    println!("{} {}", check(), "Configuration is valid".success());
    Ok(0)
}
