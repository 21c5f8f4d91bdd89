pub mod calendars;
pub mod config;
pub mod events;
pub mod sync;

use anyhow::Result;
use owo_colors::OwoColorize;
use remindsync_core::config::Settings;
use remindsync_core::provider::subprocess::SubprocessProvider;
use remindsync_core::source::Upcoming;
use remindsync_core::{CancelToken, Selection, Session, SyncError, SyncWindow};
use tokio::task::JoinHandle;

use crate::utils::tui;

/// How the user chose the window to look at.
pub struct WindowChoice {
    pub days: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl WindowChoice {
    fn resolve(&self, settings: &Settings) -> Result<SyncWindow> {
        let window = match (&self.from, &self.to) {
            (Some(from), Some(to)) => SyncWindow::from_args(from, to),
            _ => SyncWindow::lookahead(self.days.unwrap_or(settings.lookahead_days)),
        };
        window.map_err(|e| anyhow::anyhow!(e))
    }
}

/// Authorize with the configured provider and load the upcoming events.
pub async fn load_session(
    settings: &Settings,
    window: &WindowChoice,
) -> Result<Session<SubprocessProvider>> {
    let window = window.resolve(settings)?;
    let provider = SubprocessProvider::from_name(&settings.provider);

    let spinner = tui::create_spinner("Connecting");
    let mut session = Session::new(provider, settings)?;
    session.on_status(tui::status_updater(spinner.clone()));

    let ctrl_c = cancel_on_ctrl_c(session.cancel_token());
    let result = session.load(window).await.map(|_| ());
    ctrl_c.abort();
    spinner.finish_and_clear();

    match result {
        Ok(()) => Ok(session),
        Err(SyncError::PermissionDenied) => anyhow::bail!(
            "{}\n\n\
            remindsync needs access to your calendars (read) and reminders (read/write).\n\
            Grant access in your system settings and run the command again.",
            "Permission needed".yellow()
        ),
        Err(e) => Err(e.into()),
    }
}

/// Cancel `token` when the user hits Ctrl-C. Abort the handle once the
/// guarded work is done.
pub fn cancel_on_ctrl_c(token: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

/// Turn calendar titles from the command line into a selection.
/// No titles selects every calendar.
pub fn resolve_selection(upcoming: &Upcoming, titles: &[String]) -> Result<Selection> {
    let mut selection = Selection::all();

    for title in titles {
        match upcoming.calendar_titled(title) {
            Some(calendar) => selection.insert(calendar.id.clone()),
            None => {
                let available: Vec<_> =
                    upcoming.calendars.iter().map(|c| c.title.as_str()).collect();
                anyhow::bail!(
                    "Calendar '{}' has no upcoming events. Available: {}",
                    title,
                    available.join(", ")
                );
            }
        }
    }

    Ok(selection)
}
