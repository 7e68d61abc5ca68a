//! Watch command - run the monitoring loop

use crate::cli::context::CommandContext;
use crate::cli::style::{
    Stylize, arrow, check, cross, human_duration, hyperlink, phase_label, spinner_style,
};
use anstream::println;
use indicatif::ProgressBar;
use pr_phase_monitor::error::Result;
use pr_phase_monitor::monitor::{CycleReport, ModeChange, Monitor, Reporter};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Options for the watch command
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Run one cycle and exit
    pub once: bool,
}

/// Prints each cycle and shows a countdown spinner between cycles
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    fn print_report(report: &CycleReport) {
        println!();
        println!(
            "{} {}",
            report.at.with_timezone(&chrono::Local).format("%H:%M:%S").muted(),
            format!("{} open pull requests", report.entries.len()).emphasis()
        );

        for entry in &report.entries {
            let dwell = entry
                .dwell
                .map(|d| format!(" ({})", human_duration(d)).caution())
                .unwrap_or_default();
            println!(
                "  {} {} {}{}",
                phase_label(entry.phase),
                entry.pr.repo.to_string().accent(),
                hyperlink(&entry.pr.title, &entry.pr.url),
                dwell
            );
        }

        if !report.issues.is_empty() {
            println!("{}", "Open issues".emphasis());
            for issue in &report.issues {
                println!(
                    "  {} {}#{} {}",
                    arrow(),
                    issue.repo.to_string().accent(),
                    issue.number,
                    hyperlink(&issue.title, &issue.url)
                );
            }
            if report.hidden_issues > 0 {
                println!("  {}", format!("... and {} more", report.hidden_issues).muted());
            }
        }

        let actions = &report.actions;
        for step in &actions.executed {
            println!("  {} {step}", check());
        }
        for step in &actions.dry_run {
            println!("  {} {step}", "[dry-run]".caution());
        }
        for (step, err) in &actions.failed {
            println!("  {} {step}: {}", cross(), err.failure());
        }

        match report.mode_change {
            ModeChange::Throttled => {
                println!("{}", "No changes for a while, polling less often".caution());
            }
            ModeChange::Restored => {
                println!("{}", "Changes detected, back to normal polling".success());
            }
            ModeChange::None => {}
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_cycle(&mut self, report: &CycleReport) {
        Self::print_report(report);
    }

    fn on_wait_tick(&mut self, remaining: Duration) {
        let spinner = self.spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(spinner_style());
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        spinner.set_message(format!("Next check in {}", human_duration(remaining).accent()));
    }

    fn on_wait_end(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Resolves on SIGINT or SIGTERM
///
/// The handlers are installed when this is called, not when the future is
/// first polled.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::debug!("received SIGTERM"),
            _ = sigint.recv() => tracing::debug!("received SIGINT"),
        }
    })
}

/// Resolves on Ctrl-C; never resolves if the handler can't be installed
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
}

/// Run the watch command, returning the process exit code
pub async fn run_watch(config_path: Option<&Path>, options: WatchOptions) -> Result<u8> {
    let mut ctx = CommandContext::new(config_path).await?;
    let dispatcher = ctx.dispatcher()?;

    println!(
        "{} {} {}",
        "Watching pull requests for".emphasis(),
        ctx.login.accent(),
        format!("(config: {})", ctx.watcher.path().display()).muted()
    );

    let shutdown = shutdown_signal()?;
    let mut monitor = Monitor::new(ctx.github.clone(), dispatcher, ctx.config.clone());
    let mut reporter = ConsoleReporter::default();
    let code = monitor
        .run(&mut ctx.watcher, &mut reporter, shutdown, options.once)
        .await?;

    Ok(u8::try_from(code).unwrap_or(1))
}
