//! Cross-task access to the running App.
//!
//! All gate state is owned by the [`crate::Runtime`]'s task. Other tasks
//! (a camera screen controller, a sync worker) talk to it through a
//! [`ScreenHandle`], which queues [`AppEvent`]s on an unbounded channel. The
//! runtime handles them one at a time, so the exemption flag and the
//! visibility monitor never race.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::{AppEvent, Handoff};

/// The runtime has stopped and no longer accepts requests.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("runtime has stopped")]
pub struct RuntimeStopped;

/// Cloneable sender for App requests.
#[derive(Debug, Clone)]
pub struct ScreenHandle {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl ScreenHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Register (or withdraw) a handoff exemption.
    pub fn set_exempt(&self, on: bool) -> Result<(), RuntimeStopped> {
        self.send(AppEvent::SetExempt(on))
    }

    /// Register the exemption and launch `handoff`.
    pub fn begin_handoff(&self, handoff: Handoff) -> Result<(), RuntimeStopped> {
        self.send(AppEvent::BeginHandoff(handoff))
    }

    /// Report a user interaction.
    pub fn interaction(&self) -> Result<(), RuntimeStopped> {
        self.send(AppEvent::Interaction)
    }

    /// Log out.
    pub fn logout(&self) -> Result<(), RuntimeStopped> {
        self.send(AppEvent::Logout)
    }

    /// Queue any event.
    pub fn send(&self, event: AppEvent) -> Result<(), RuntimeStopped> {
        self.tx.send(event).map_err(|_| RuntimeStopped)
    }
}
