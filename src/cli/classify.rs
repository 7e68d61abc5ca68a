//! Classify command - show the phase of a single pull request

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow, hyperlink, phase_label};
use anstream::println;
use pr_phase_monitor::error::Result;
use pr_phase_monitor::phase::classify_with_rule;
use pr_phase_monitor::platform::SnapshotSource;
use std::path::Path;

/// Run the classify command
pub async fn run_classify(url: &str, config_path: Option<&Path>) -> Result<u8> {
    let ctx = CommandContext::new(config_path).await?;
    let pr = ctx.github.fetch_pull_request(url).await?;
    let (phase, rule) = classify_with_rule(&pr, &ctx.config.bots);

    println!("{}", hyperlink(&pr.title, &pr.url).emphasis());
    println!("  {} {}", arrow(), phase_label(phase));
    println!(
        "  {}",
        format!(
            "rule: {rule}, {} reviews, {} unresolved threads",
            pr.reviews.len(),
            pr.threads.iter().filter(|t| t.needs_attention()).count()
        )
        .muted()
    );
    Ok(0)
}
