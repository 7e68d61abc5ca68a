//! pr-phase-monitor - watch pull requests and drive them through review
//!
//! Every polling cycle fetches the open pull requests of the watched owners,
//! classifies each into a [`phase::Phase`], and performs the action that
//! phase calls for: marking drafts ready, asking the coding agent for fixes,
//! notifying, and optionally merging. Per-repository behavior comes from
//! ordered rulesets in the configuration file. Polling slows down while
//! nothing changes.
//!
//! # Architecture
//!
//! - [`phase`] - the pure classifier (an ordered decision table)
//! - [`config`] - configuration document, ruleset resolution, hot reload
//! - [`monitor`] - the scheduler, its session state and dispatch guards
//! - [`platform`] - GitHub, ntfy and browser collaborators behind traits
//! - [`auth`] - token discovery

pub mod auth;
pub mod config;
pub mod error;
pub mod monitor;
pub mod phase;
pub mod platform;
pub mod types;
