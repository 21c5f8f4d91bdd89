//! TUI rendering traits for remindsync types.
//!
//! Extension traits that add colored terminal output to remindsync-core
//! types using owo_colors.

use chrono::{DateTime, Local, NaiveDate, Utc};
use owo_colors::OwoColorize;
use remindsync_core::color;
use remindsync_core::engine::PlannedList;
use remindsync_core::{Calendar, Event, SyncReport};

pub trait Render {
    fn render(&self) -> String;
}

/// A colored dot for a calendar, like the chips in a calendar picker.
fn chip(calendar: &Calendar) -> String {
    match color::resolve(calendar.color.as_ref()) {
        Some(rgb) => {
            let (r, g, b) = rgb.to_u8();
            "●".truecolor(r, g, b).to_string()
        }
        None => "○".dimmed().to_string(),
    }
}

impl Render for Calendar {
    fn render(&self) -> String {
        format!("{} {}", chip(self), self.title)
    }
}

/// Render a calendar with how many events it has in the window.
pub fn render_calendar_row(calendar: &Calendar, events: usize, selected: bool) -> String {
    let mark = if selected { "[x]" } else { "[ ]" };
    let count = format!("({} {})", events, pluralize("event", events));
    format!("{} {} {}", mark.dimmed(), calendar.render(), count.dimmed())
}

/// Render the events grouped by day, tagged with their calendar.
pub fn render_events(events: &[Event], calendars: &[Calendar]) -> String {
    if events.is_empty() {
        return "No events found".dimmed().to_string();
    }

    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut lines = Vec::new();
    let mut current_date = None;

    for event in sorted {
        let date = local_date(&event.start);
        if current_date != Some(date) {
            if current_date.is_some() {
                lines.push(String::new());
            }
            lines.push(format_date_label(date).bold().to_string());
            current_date = Some(date);
        }

        let time = event.start.with_timezone(&Local).format("%H:%M").to_string();
        let tag = event
            .calendar
            .as_ref()
            .and_then(|id| calendars.iter().find(|c| &c.id == id))
            .map(|c| format!("{} {}", chip(c), c.title.dimmed()))
            .unwrap_or_default();

        lines.push(format!("  {:>5} {} {}", time, event, tag));
    }

    lines.join("\n")
}

impl Render for PlannedList {
    fn render(&self) -> String {
        let mut lines = vec![self.calendar.render()];

        if self.tasks.is_empty() {
            lines.push("   No reminders".dimmed().to_string());
        }
        for task in &self.tasks {
            lines.push(format!(
                "   {} {} {}",
                "+".green(),
                task.title.green(),
                format!("due {}", task.due).dimmed()
            ));
        }

        lines.join("\n")
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        for outcome in &self.synced {
            let mut detail = format!(
                "{} {}",
                outcome.tasks,
                pluralize("reminder", outcome.tasks)
            );
            if outcome.created_list {
                detail.push_str(", new list");
            }
            if outcome.skipped_removals > 0 {
                detail.push_str(&format!(
                    ", {} old {} left in place",
                    outcome.skipped_removals,
                    pluralize("reminder", outcome.skipped_removals)
                ));
            }
            lines.push(format!(
                "   {} {} {}",
                "✓".green(),
                outcome.calendar,
                format!("({})", detail).dimmed()
            ));
        }

        for failure in &self.failed {
            lines.push(format!(
                "   {} {} {}",
                "✗".red(),
                failure.calendar.red(),
                failure.reason.dimmed()
            ));
        }

        let (created_lists, removed, created) = self.counts();
        lines.push(String::new());
        lines.push(format!(
            "Synced: {} created, {} removed, {} new {}",
            created,
            removed,
            created_lists,
            pluralize("list", created_lists)
        ));

        lines.join("\n")
    }
}

fn local_date(at: &DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(date: NaiveDate) -> String {
    let today = Local::now().date_naive();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// Simple pluralization helper
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
