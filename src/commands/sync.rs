use anyhow::Result;
use owo_colors::OwoColorize;
use remindsync_core::Session;
use remindsync_core::provider::Provider;

use crate::render::{Render, pluralize};
use crate::utils::tui;

pub async fn run<P: Provider>(
    session: &mut Session<P>,
    titles: &[String],
    dry_run: bool,
) -> Result<()> {
    let selection = super::resolve_selection(session.upcoming(), titles)?;

    if dry_run {
        let plan = session.plan(&selection);
        for (i, list) in plan.iter().enumerate() {
            println!("{}", list.render());
            if i < plan.len() - 1 {
                println!();
            }
        }
        if plan.is_empty() {
            println!("{}", "Nothing to sync".dimmed());
        }
        return Ok(());
    }

    let count = session.filtered(&selection).len();
    let spinner = tui::create_spinner(format!("Syncing {} {}", count, pluralize("event", count)));
    session.on_status(tui::status_updater(spinner.clone()));

    // Stop at the next provider call on Ctrl-C; nothing staged gets committed
    let ctrl_c = super::cancel_on_ctrl_c(session.cancel_token());

    let result = session.sync(&selection).await;
    ctrl_c.abort();
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", report.render());

    if !report.is_complete() {
        anyhow::bail!(
            "{} {} could not be synced: {}",
            report.failed.len(),
            pluralize("calendar", report.failed.len()),
            report.failed_titles().join(", ")
        );
    }

    Ok(())
}
