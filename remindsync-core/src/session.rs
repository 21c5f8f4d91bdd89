//! Session state machine and the run driver built on top of it.
//!
//! A front end owns one `Session`, calls `load` once to authorize and fetch,
//! lets the user pick calendars, then calls `sync`. The current
//! `SessionState` is all a presentation layer needs to render.

use std::fmt;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::engine::{PlannedList, SyncEngine, SyncReport};
use crate::error::{SyncError, SyncResult};
use crate::gate;
use crate::model::Event;
use crate::provider::Provider;
use crate::selection::{self, Selection};
use crate::source::{EventSource, Upcoming};
use crate::window::SyncWindow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Authorizing,
    Loading,
    Ready,
    Syncing,
    Done(SyncReport),
    PermissionNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Authorized,
    Denied,
    Loaded,
    SyncRequested,
    SyncFinished(SyncReport),
    Failed,
    Reset,
}

impl SessionState {
    pub fn next(&self, event: SessionEvent) -> SyncResult<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,
            (S::Idle | S::PermissionNeeded, E::Start) => S::Authorizing,
            (S::Authorizing, E::Authorized) => S::Loading,
            (S::Authorizing | S::Loading, E::Denied) => S::PermissionNeeded,
            (S::Authorizing | S::Loading, E::Failed) => S::Idle,
            (S::Loading, E::Loaded) => S::Ready,
            (S::Ready | S::Done(_), E::SyncRequested) => S::Syncing,
            (S::Syncing, E::SyncFinished(report)) => S::Done(report),
            (S::Syncing, E::Failed) => S::Ready,
            (from, event) => {
                return Err(SyncError::InvalidTransition {
                    from: from.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Authorizing | SessionState::Loading | SessionState::Syncing
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Authorizing => "authorizing",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Syncing => "syncing",
            SessionState::Done(_) => "done",
            SessionState::PermissionNeeded => "permission needed",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SessionEvent::Start => "start",
            SessionEvent::Authorized => "authorized",
            SessionEvent::Denied => "denied",
            SessionEvent::Loaded => "loaded",
            SessionEvent::SyncRequested => "sync requested",
            SessionEvent::SyncFinished(_) => "sync finished",
            SessionEvent::Failed => "failed",
            SessionEvent::Reset => "reset",
        };
        write!(f, "{}", name)
    }
}

type StatusObserver = Box<dyn Fn(&str) + Send + Sync>;

pub struct Session<P> {
    provider: P,
    engine: SyncEngine,
    source: EventSource,
    lookahead_days: i64,
    state: SessionState,
    upcoming: Upcoming,
    cancel: CancelToken,
    observer: Option<StatusObserver>,
}

impl<P: Provider> Session<P> {
    pub fn new(provider: P, settings: &Settings) -> SyncResult<Self> {
        Ok(Session {
            provider,
            engine: SyncEngine::new(settings.timezone()?),
            source: EventSource::new(settings.color_retry()?),
            lookahead_days: settings.lookahead_days,
            state: SessionState::Idle,
            upcoming: Upcoming::default(),
            cancel: CancelToken::new(),
            observer: None,
        })
    }

    /// Receive textual progress updates, e.g. for a spinner.
    /// Replaces any earlier observer.
    pub fn on_status(&mut self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn upcoming(&self) -> &Upcoming {
        &self.upcoming
    }

    /// Token that cancels whatever the session is doing at its next provider call.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn default_window(&self) -> SyncResult<SyncWindow> {
        SyncWindow::lookahead(self.lookahead_days).map_err(SyncError::Config)
    }

    fn status(&self, message: &str) {
        debug!(state = %self.state, "{}", message);
        if let Some(observer) = &self.observer {
            observer(message);
        }
    }

    fn transition(&mut self, event: SessionEvent) -> SyncResult<()> {
        self.state = self.state.next(event)?;
        Ok(())
    }

    /// Authorize once, then fetch the events in `window`.
    pub async fn load(&mut self, window: SyncWindow) -> SyncResult<&Upcoming> {
        self.transition(SessionEvent::Start)?;
        self.status("Requesting access to calendars and reminders");

        if let Err(e) = gate::authorize(&self.provider).await {
            self.transition(SessionEvent::Denied)?;
            return Err(e);
        }
        self.transition(SessionEvent::Authorized)?;
        self.status("Loading upcoming events");

        match self
            .source
            .fetch_upcoming(&self.provider, &window, &self.cancel)
            .await
        {
            Ok(upcoming) => {
                self.upcoming = upcoming;
                self.transition(SessionEvent::Loaded)?;
                Ok(&self.upcoming)
            }
            Err(SyncError::PermissionDenied) => {
                self.transition(SessionEvent::Denied)?;
                Err(SyncError::PermissionDenied)
            }
            Err(e) => {
                self.transition(SessionEvent::Failed)?;
                Err(e)
            }
        }
    }

    /// Loaded events narrowed to `selection`.
    pub fn filtered(&self, selection: &Selection) -> Vec<Event> {
        selection::apply(&self.upcoming.events, selection)
    }

    /// What `sync` would write for `selection`.
    pub fn plan(&self, selection: &Selection) -> Vec<PlannedList> {
        let calendars = selection.calendars_in(&self.upcoming.calendars);
        self.engine.plan(&self.filtered(selection), &calendars)
    }

    /// Mirror the loaded events of the selected calendars.
    pub async fn sync(&mut self, selection: &Selection) -> SyncResult<SyncReport> {
        if self.state.is_busy() || self.engine.is_running() {
            return Err(SyncError::AlreadyRunning);
        }
        self.transition(SessionEvent::SyncRequested)?;

        let events = self.filtered(selection);
        let calendars = selection.calendars_in(&self.upcoming.calendars);
        self.status(&format!("Syncing {} events", events.len()));

        match self
            .engine
            .sync(&events, &calendars, &self.provider, &self.cancel)
            .await
        {
            Ok(report) => {
                self.transition(SessionEvent::SyncFinished(report.clone()))?;
                self.status("Sync complete");
                Ok(report)
            }
            Err(e) => {
                self.transition(SessionEvent::Failed)?;
                Err(e)
            }
        }
    }
}
