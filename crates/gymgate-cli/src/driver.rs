//! Terminal driver for the front desk.
//!
//! Implements the [`Driver`] trait for a line-oriented terminal: commands are
//! read from an async line source (stdin in production), timers are tokio
//! tasks that post [`AppEvent::TimerFired`] back into the driver, and frames
//! are plain text written to any [`Write`] sink.
//!
//! A terminal has no camera. Starting a capture flow prints a notice and puts
//! the app in the background; `back` brings it to the foreground again, which
//! is exactly what the session gate sees on a phone.

use std::{
    collections::{HashMap, VecDeque},
    io::{self, Stdout, Write},
    time::Instant,
};

use gymgate_app::{App, AppEvent, Driver, Handoff, Screen};
use gymgate_core::{TimerKind, TimerToken, Visibility, env::Environment};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
    task::AbortHandle,
};

use crate::{
    SystemEnv,
    command::{self, Command, HELP},
};

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No async runtime to host the timer task.
    #[error("timer unavailable: {0}")]
    Timer(String),

    /// This terminal was started without capture flows.
    #[error("{} is not available on this terminal", .0.label())]
    Unavailable(Handoff),

    /// A capture flow is already in progress.
    #[error("already away in the {}", .0.label())]
    Away(Handoff),
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Generic over the input line source and the output sink so the same
/// driver runs against stdin/stdout and against in-memory buffers.
pub struct TerminalDriver<R = BufReader<Stdin>, W = Stdout>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    lines: Lines<R>,
    out: W,
    queued: VecDeque<AppEvent>,
    timer_tx: mpsc::UnboundedSender<AppEvent>,
    timer_rx: mpsc::UnboundedReceiver<AppEvent>,
    timers: HashMap<TimerToken, AbortHandle>,
    away: Option<Handoff>,
    capture_flows: bool,
    env: SystemEnv,
}

impl TerminalDriver {
    /// Driver reading commands from stdin and writing frames to stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R, W> TerminalDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver over the given line source and output sink.
    pub fn new(input: R, out: W) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            lines: input.lines(),
            out,
            queued: VecDeque::new(),
            timer_tx,
            timer_rx,
            timers: HashMap::new(),
            away: None,
            capture_flows: true,
            env: SystemEnv::new(),
        }
    }

    /// Enable or disable capture flows. Disabled flows fail to launch.
    #[must_use]
    pub fn with_capture_flows(mut self, enabled: bool) -> Self {
        self.capture_flows = enabled;
        self
    }

    /// Output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Number of timers currently scheduled.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Capture flow the app is currently away in.
    pub fn away(&self) -> Option<Handoff> {
        self.away
    }

    fn handle_line(&mut self, line: &str) -> Result<(), TerminalError> {
        match command::parse(line) {
            Command::Events(events) => self.queued.extend(events),
            Command::Back => match self.away.take() {
                Some(handoff) => {
                    tracing::debug!(?handoff, "returned from capture flow");
                    self.queued.push_back(AppEvent::Visibility(Visibility::Foreground));
                },
                None => writeln!(self.out, "nothing to return from")?,
            },
            Command::Unknown(input) => {
                writeln!(self.out, "unknown command: {input}")?;
                writeln!(self.out, "{HELP}")?;
            },
        }
        Ok(())
    }
}

impl<R, W> Driver for TerminalDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Ok(Some(event));
            }

            let line = tokio::select! {
                biased;
                Some(event) = self.timer_rx.recv() => {
                    if let AppEvent::TimerFired { token, .. } = event {
                        self.timers.remove(&token);
                    }
                    return Ok(Some(event));
                }
                line = self.lines.next_line() => line?,
            };

            let Some(line) = line else {
                return Ok(None);
            };
            self.handle_line(&line)?;
        }
    }

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_time_secs(&self) -> u64 {
        self.env.wall_clock_secs()
    }

    fn render(&mut self, app: &App<Instant>) -> Result<(), Self::Error> {
        self.out.write_all(frame(app).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn haptic(&mut self) {
        if let Err(e) = self.out.write_all(b"\x07").and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "bell failed");
        }
    }

    fn schedule_timer(
        &mut self,
        kind: TimerKind,
        token: TimerToken,
        deadline: Instant,
    ) -> Result<(), Self::Error> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TerminalError::Timer(e.to_string()))?;

        let tx = self.timer_tx.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            let _ = tx.send(AppEvent::TimerFired { kind, token });
        });

        if let Some(previous) = self.timers.insert(token, task.abort_handle()) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel_timer(&mut self, _kind: TimerKind, token: TimerToken) {
        if let Some(task) = self.timers.remove(&token) {
            task.abort();
        }
    }

    fn launch_external(&mut self, handoff: Handoff) -> Result<(), Self::Error> {
        if !self.capture_flows {
            return Err(TerminalError::Unavailable(handoff));
        }
        if let Some(current) = self.away {
            return Err(TerminalError::Away(current));
        }

        writeln!(self.out, "[{} open, type `back` to return]", handoff.label())?;
        self.away = Some(handoff);
        self.queued.push_back(AppEvent::Visibility(Visibility::Background));
        Ok(())
    }

    fn stop(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
        self.queued.clear();
        let _ = self.out.flush();
    }
}

impl<R, W> Drop for TerminalDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    fn drop(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }
}

/// Text frame for the current app state.
pub fn frame(app: &App<Instant>) -> String {
    let mut text = format!("\n== {} ==\n", app.screen().title());

    if app.screen() == Screen::Lock {
        text.push_str(&format!("PIN: {}\n", "*".repeat(app.keypad().len())));
    } else {
        let shortcuts: Vec<String> = Screen::AUTHENTICATED
            .iter()
            .enumerate()
            .map(|(i, screen)| format!("{} {}", i + 1, screen.title()))
            .collect();
        text.push_str(&shortcuts.join("  "));
        text.push('\n');
    }

    if let Some(modal) = app.countdown_modal() {
        text.push_str(&format!("{}\n", modal.message()));
    }
    if let Some(status) = app.status_message() {
        text.push_str(&format!("! {status}\n"));
    }

    text.push_str("> ");
    text
}
