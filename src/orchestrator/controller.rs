//! Server lifecycle controller.
//!
//! Owns the supervisor and serializes start/stop requests coming from the UI.

use crate::cli::{build_params, Cli};
use crate::model::{LaunchParams, ServerEvent};
use crate::supervisor::pty::PtySpawner;
use crate::supervisor::Supervisor;
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the supervised server.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start(LaunchParams),
    Stop,
    Quit,
}

/// Drive the supervisor from UI commands and emit events back to presentation
/// layers.
pub(crate) async fn run_controller(
    args: &Cli,
    event_tx: UnboundedSender<ServerEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut supervisor = Supervisor::new(
        args.server_bin.clone(),
        Box::new(PtySpawner::default()),
        event_tx,
    );

    if args.start_on_launch {
        // A spawn failure is already surfaced on the sink as a notice; the TUI
        // stays up so the user can fix the parameters and retry.
        let _ = supervisor.start(&build_params(args));
    }

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::Start(params) => {
                let _ = supervisor.start(&params);
            }
            UiCommand::Stop => {
                let _ = supervisor.stop();
            }
            UiCommand::Quit => break,
        }
    }

    // Do not orphan a running server on quit; request graceful shutdown.
    if supervisor.is_running() {
        let _ = supervisor.stop();
    }
    Ok(())
}
