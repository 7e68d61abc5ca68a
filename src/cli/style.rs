//! Console styling: colors, symbols, hyperlinks and the wait spinner

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use pr_phase_monitor::phase::Phase;
use std::fmt::Display;
use std::time::Duration;

/// Success mark
pub const CHECK: &str = "✓";

/// Failure mark
pub const CROSS: &str = "✗";

/// Semantic styles; `anstream` strips them when stdout is not a terminal
pub trait Stylize: Display + Sized {
    /// Headings and key values
    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    /// Secondary text
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    /// Counts, names, durations
    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    /// Completed actions
    fn success(&self) -> String {
        self.green().to_string()
    }

    /// Dry-run and throttling notices
    fn caution(&self) -> String {
        self.yellow().to_string()
    }

    /// Failures
    fn failure(&self) -> String {
        self.red().bold().to_string()
    }
}

impl<T: Display> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.failure()
}

/// Dimmed arrow for list items
pub fn arrow() -> String {
    "→".muted()
}

/// Phase name colored by how much attention it needs
pub fn phase_label(phase: Phase) -> String {
    let name = format!("{:<16}", phase.as_str());
    match phase {
        Phase::Draft => name.muted(),
        Phase::NeedsFix => name.caution(),
        Phase::ReadyForReview => name.success().emphasis(),
        Phase::AgentWorking => name.accent(),
    }
}

/// Clickable link when the terminal supports it, plain text otherwise
pub fn hyperlink(text: &str, url: &str) -> String {
    if supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        terminal_link::Link::new(text, url).to_string()
    } else {
        text.to_string()
    }
}

/// Compact "1h 5m 3s" rendering for countdowns and dwell times
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s}s"),
        _ => format!("{h}h {m}m"),
    }
}

/// Spinner used while waiting between cycles
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
