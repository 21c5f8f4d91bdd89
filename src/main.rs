mod commands;
mod logging;
mod render;
mod utils;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use remindsync_core::config::Settings;

use crate::commands::WindowChoice;

#[derive(Parser)]
#[command(name = "remindsync")]
#[command(about = "Mirror upcoming calendar events into reminder lists")]
struct Cli {
    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (-q, -qq)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WindowArgs {
    /// Look this many days ahead (defaults to lookahead_days from the config)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    days: Option<i64>,

    /// Start of an explicit window (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Last day of an explicit window (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<String>,
}

impl From<WindowArgs> for WindowChoice {
    fn from(args: WindowArgs) -> Self {
        WindowChoice {
            days: args.days,
            from: args.from,
            to: args.to,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List calendars that have upcoming events
    Calendars {
        /// Mark only these calendars as selected (by title)
        #[arg(short, long)]
        calendar: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// List upcoming events of the selected calendars
    Events {
        /// Only include these calendars (by title); all when omitted
        #[arg(short, long)]
        calendar: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Replace each selected calendar's reminder list with its upcoming events
    Sync {
        /// Only sync these calendars (by title); all when omitted
        #[arg(short, long)]
        calendar: Vec<String>,

        #[command(flatten)]
        window: WindowArgs,

        /// Show the reminders that would be created without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the config file location and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.quiet)?;

    let settings = Settings::load()?;

    match cli.command {
        Commands::Calendars { calendar, window } => {
            let session = commands::load_session(&settings, &window.into()).await?;
            commands::calendars::run(&session, &calendar)
        }
        Commands::Events { calendar, window } => {
            let session = commands::load_session(&settings, &window.into()).await?;
            commands::events::run(&session, &calendar)
        }
        Commands::Sync {
            calendar,
            window,
            dry_run,
        } => {
            let mut session = commands::load_session(&settings, &window.into()).await?;
            commands::sync::run(&mut session, &calendar, dry_run).await
        }
        Commands::Config => commands::config::run(&settings),
    }
}
