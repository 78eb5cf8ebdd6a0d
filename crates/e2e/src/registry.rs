//! Single-slot holder for the scenario's active browser session

use std::sync::Arc;

use tracing::warn;

use crate::error::{E2eError, E2eResult};
use crate::session::BrowserSession;

/// Holds at most one session. Lives inside a scenario's context, so two
/// scenarios never see each other's browser.
#[derive(Default)]
pub struct SessionRegistry {
    slot: Option<Arc<dyn BrowserSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `session`, replacing whatever was there.
    pub fn set(&mut self, session: Arc<dyn BrowserSession>) {
        if let Some(previous) = &self.slot {
            warn!(
                "Replacing registered session {} with {} without quitting it",
                previous.id(),
                session.id()
            );
        }
        self.slot = Some(session);
    }

    /// The registered session, or [`E2eError::NoActiveSession`].
    pub fn get(&self) -> E2eResult<Arc<dyn BrowserSession>> {
        self.slot.clone().ok_or(E2eError::NoActiveSession)
    }

    pub fn is_set(&self) -> bool {
        self.slot.is_some()
    }

    /// Empty the slot, handing ownership to the caller for teardown.
    pub fn take(&mut self) -> Option<Arc<dyn BrowserSession>> {
        self.slot.take()
    }
}
