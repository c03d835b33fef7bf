//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI and session state machine
//! - [`SessionBridge`]: best-effort persistence
//! - [`Driver`]: Platform-specific I/O
//!
//! Failures the session gate can survive never leave the loop. A timer the
//! platform refuses turns idle protection off for the session, a failed
//! session write is logged, and a failed render or handoff launch is logged
//! and shown as a status message. Only driver input errors stop the runtime.

use gymgate_core::{GateError, SettingsStore};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{App, AppAction, AppEvent, Driver, ScreenHandle, SessionBridge};

/// Errors that stop the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// The driver failed to deliver input.
    #[error("driver error: {0}")]
    Driver(#[source] E),
}

/// Generic runtime that orchestrates App, SessionBridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `S`: Settings store for session records
pub struct Runtime<D, S>
where
    D: Driver,
    S: SettingsStore,
{
    driver: D,
    app: App<D::Instant>,
    bridge: SessionBridge<S>,
    requests_tx: mpsc::UnboundedSender<AppEvent>,
    requests: mpsc::UnboundedReceiver<AppEvent>,
}

impl<D, S> Runtime<D, S>
where
    D: Driver,
    S: SettingsStore,
{
    /// Create a new runtime with the given driver, app and store.
    pub fn new(driver: D, app: App<D::Instant>, store: S) -> Self {
        let (requests_tx, requests) = mpsc::unbounded_channel();
        Self { driver, app, bridge: SessionBridge::new(store), requests_tx, requests }
    }

    /// Handle for other tasks to send requests to this runtime.
    pub fn handle(&self) -> ScreenHandle {
        ScreenHandle::new(self.requests_tx.clone())
    }

    /// Run the main event loop.
    ///
    /// This is the core orchestration loop that:
    /// 1. Waits for the next request from a [`ScreenHandle`] or input event
    ///    from the driver (handle requests first)
    /// 2. Feeds it to the App
    /// 3. Executes the resulting actions in order
    ///
    /// Returns when the App asks to quit or the driver's input closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to deliver input.
    pub async fn run(&mut self) -> Result<(), RuntimeError<D::Error>> {
        if let Some(record) = self.bridge.last_session()
            && record.authenticated
        {
            tracing::info!(
                changed_at_secs = record.changed_at_secs,
                "previous session was not closed, starting locked"
            );
        }

        self.render();

        loop {
            let next = tokio::select! {
                biased;
                Some(event) = self.requests.recv() => Some(event),
                polled = self.driver.poll_event() => polled.map_err(RuntimeError::Driver)?,
            };

            let Some(event) = next else {
                tracing::debug!("input closed");
                break;
            };

            if self.dispatch(event).await {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Feed one event to the App and execute the resulting actions.
    ///
    /// Returns `true` if the application should quit.
    pub async fn dispatch(&mut self, event: AppEvent) -> bool {
        let now = self.driver.now();
        let actions = self.app.handle(event, now);
        self.process_actions(actions).await
    }

    /// Execute actions in order, including any follow-ups they produce.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction<D::Instant>>) -> bool {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.render(),
                    AppAction::Quit => return true,
                    AppAction::Haptic => self.driver.haptic(),
                    AppAction::ArmTimer { kind, token, deadline } => {
                        if let Err(e) = self.driver.schedule_timer(kind, token, deadline) {
                            let error = GateError::SchedulingFailure { kind, reason: e.to_string() };
                            tracing::warn!(%error, "timer rejected by platform");
                            pending_actions.extend(self.app.disable_idle_protection(&error));
                        }
                    },
                    AppAction::CancelTimer { kind, token } => self.driver.cancel_timer(kind, token),
                    AppAction::PersistSession { authenticated } => {
                        let at = self.driver.unix_time_secs();
                        self.bridge.record_session(authenticated, at);
                    },
                    AppAction::NavigateToLock => {
                        // Let anything the logout woke up run before the
                        // screen changes under it
                        tokio::task::yield_now().await;
                        pending_actions.extend(self.app.show_lock_screen());
                    },
                    AppAction::LaunchExternal(handoff) => {
                        match self.driver.launch_external(handoff) {
                            Ok(()) => tracing::info!(?handoff, "external flow launched"),
                            Err(e) => {
                                tracing::warn!(?handoff, error = %e, "failed to launch external flow");
                                pending_actions.extend(self.app.handoff_failed(handoff));
                            },
                        }
                    },
                }
            }
        }
        false
    }

    fn render(&mut self) {
        if let Err(e) = self.driver.render(&self.app) {
            tracing::warn!(error = %e, "render failed");
        }
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App<D::Instant> {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App<D::Instant> {
        &mut self.app
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Get a reference to the SessionBridge
    pub fn bridge(&self) -> &SessionBridge<S> {
        &self.bridge
    }
}
