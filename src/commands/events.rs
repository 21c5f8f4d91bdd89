use anyhow::Result;
use remindsync_core::Session;
use remindsync_core::provider::Provider;

use crate::render::render_events;

pub fn run<P: Provider>(session: &Session<P>, titles: &[String]) -> Result<()> {
    let selection = super::resolve_selection(session.upcoming(), titles)?;
    let events = session.filtered(&selection);

    println!("{}", render_events(&events, &session.upcoming().calendars));

    Ok(())
}
