use anyhow::Result;
use owo_colors::OwoColorize;
use remindsync_core::Session;
use remindsync_core::provider::Provider;

use crate::render::render_calendar_row;

pub fn run<P: Provider>(session: &Session<P>, titles: &[String]) -> Result<()> {
    let upcoming = session.upcoming();

    if upcoming.calendars.is_empty() {
        println!("{}", "No calendars with upcoming events".dimmed());
        return Ok(());
    }

    let selection = super::resolve_selection(upcoming, titles)?;

    for calendar in &upcoming.calendars {
        let events = upcoming
            .events
            .iter()
            .filter(|e| e.belongs_to(&calendar.id))
            .count();
        let selected = selection.is_empty() || selection.contains(&calendar.id);
        println!("{}", render_calendar_row(calendar, events, selected));
    }

    Ok(())
}
