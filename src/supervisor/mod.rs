//! Server process supervisor.
//!
//! Owns the lifecycle of at most one external server process and serializes
//! start/stop requests against it. Presentation layers observe it only through
//! the `ServerEvent` channel.

pub mod pty;

use crate::model::{LaunchParams, Notice, ServerEvent};
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

/// Handle for a spawned server process.
pub trait ServerHandle: Send {
    fn pid(&self) -> u32;
    /// Whether the child is still believed to be running; flipped by the
    /// spawner's wait thread when the child is reaped.
    fn is_alive(&self) -> bool;
    /// Request graceful termination (SIGINT). Never blocks on exit.
    fn interrupt(&mut self) -> Result<()>;
}

/// Process-creation seam so the state machine is testable without forking.
pub trait Spawn: Send {
    fn spawn(
        &self,
        program: &str,
        args: &[String],
        events: UnboundedSender<ServerEvent>,
    ) -> Result<Box<dyn ServerHandle>>;
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    /// A live server is already tracked; nothing was spawned.
    AlreadyRunning,
}

/// Outcome of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { pid: u32 },
    NotRunning,
}

pub struct Supervisor {
    program: String,
    spawner: Box<dyn Spawn>,
    events: UnboundedSender<ServerEvent>,
    running: Option<Box<dyn ServerHandle>>,
}

impl Supervisor {
    pub fn new(
        program: impl Into<String>,
        spawner: Box<dyn Spawn>,
        events: UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            program: program.into(),
            spawner,
            events,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|h| h.pid())
    }

    /// Launch the server with the given parameters.
    ///
    /// Rejected with a notice if a live server is already tracked. The full
    /// command line is announced on the sink before the spawn is attempted.
    /// Spawn failures are surfaced both as a notice and as the returned error.
    pub fn start(&mut self, params: &LaunchParams) -> Result<StartOutcome> {
        if let Some(handle) = &self.running {
            if handle.is_alive() {
                self.notify(Notice::AlreadyRunning);
                return Ok(StartOutcome::AlreadyRunning);
            }
            // The child exited on its own; clear the stale handle and relaunch.
            let pid = handle.pid();
            self.running = None;
            self.notify(Notice::Message(format!(
                "---(server pid {pid} exited on its own)---"
            )));
        }

        let params = params.clone().normalized();
        let _ = self
            .events
            .send(ServerEvent::CommandLine(params.command_line(&self.program)));

        let handle = match self.spawner.spawn(&self.program, &params.to_args(), self.events.clone())
        {
            Ok(handle) => handle,
            Err(e) => {
                self.notify(Notice::SpawnFailed(format!("{e:#}")));
                return Err(e);
            }
        };

        let pid = handle.pid();
        self.running = Some(handle);
        let _ = self.events.send(ServerEvent::Started { pid });
        Ok(StartOutcome::Started { pid })
    }

    /// Request graceful termination of the tracked server.
    ///
    /// Rejected with a notice when no server is tracked. Only requests
    /// termination; whether the child honors the signal is not verified, and
    /// the call never blocks waiting for exit.
    pub fn stop(&mut self) -> Result<StopOutcome> {
        let Some(mut handle) = self.running.take() else {
            self.notify(Notice::NotRunning);
            return Ok(StopOutcome::NotRunning);
        };

        let pid = handle.pid();
        if !handle.is_alive() {
            // Nothing left to signal; the wait thread already reported the exit.
            self.notify(Notice::Message(format!(
                "---(server pid {pid} exited on its own)---"
            )));
            return Ok(StopOutcome::Stopped { pid });
        }

        handle.interrupt()?;
        self.notify(Notice::Killed);
        Ok(StopOutcome::Stopped { pid })
    }

    fn notify(&self, notice: Notice) {
        let _ = self.events.send(ServerEvent::Notice(notice));
    }
}
