use anyhow::Result;
use owo_colors::OwoColorize;
use remindsync_core::config::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let path = Settings::config_path()?;

    println!("{} {}", "Config file:".dimmed(), path.display());
    println!();
    print!("{}", settings.to_toml()?);

    Ok(())
}
