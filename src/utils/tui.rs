use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(80);

pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(TICK);
    spinner
}

/// Callback that mirrors session status text onto `spinner`.
pub fn status_updater(spinner: ProgressBar) -> impl Fn(&str) + Send + Sync + 'static {
    move |message: &str| spinner.set_message(message.to_string())
}
