use crate::model::{
    ansi_command_line, LaunchParams, Notice, ServerEvent, DEFAULT_DATABASES, DEFAULT_DBFILENAME,
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT,
};
use crate::supervisor::pty::PtySpawner;
use crate::supervisor::Supervisor;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default server binary; a bare name is resolved via PATH.
pub const DEFAULT_SERVER_BIN: &str = "redis-server";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "redis-console",
    version,
    about = "Launch and supervise a local Redis server from a terminal UI"
)]
pub struct Cli {
    /// Path to the redis-server executable
    #[arg(long, default_value = DEFAULT_SERVER_BIN)]
    pub server_bin: String,

    /// Interface the server binds to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port on which the server listens for incoming connections
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Close a client connection idle for this many seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT)]
    pub timeout: u64,

    /// Number of keyspaces the server maintains
    #[arg(long, default_value_t = DEFAULT_DATABASES, value_parser = clap::value_parser!(u32).range(1..=99))]
    pub databases: u32,

    /// Where the server saves/loads its database file
    #[arg(long, default_value = DEFAULT_DBFILENAME)]
    pub dbfilename: String,

    /// Run without the TUI: launch immediately and stream server output until Ctrl-C
    #[arg(long)]
    pub text: bool,

    /// Start the server as soon as the TUI launches
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub start_on_launch: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.text {
        return run_text(args).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(args).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        run_text(args).await
    }
}

/// Build `LaunchParams` from CLI arguments.
pub fn build_params(args: &Cli) -> LaunchParams {
    LaunchParams {
        host: args.host.clone(),
        port: args.port.to_string(),
        timeout: args.timeout.to_string(),
        databases: args.databases,
        dbfilename: args.dbfilename.clone(),
    }
    .normalized()
}

/// Spawn a blocking stdout writer so raw PTY bytes never block async tasks.
fn spawn_sink_writer() -> (
    mpsc::UnboundedSender<Vec<u8>>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        while let Some(bytes) = rx.blocking_recv() {
            let _ = out.write_all(&bytes);
            let _ = out.flush();
        }
        let _ = out.flush();
    });
    (tx, handle)
}

/// Forward one event to the raw byte sink. Returns true once the child exited.
fn forward_event(sink_tx: &mpsc::UnboundedSender<Vec<u8>>, ev: ServerEvent) -> bool {
    match ev {
        ServerEvent::CommandLine(argv) => {
            let _ = sink_tx.send(ansi_command_line(&argv).into_bytes());
            false
        }
        ServerEvent::Started { .. } => false,
        ServerEvent::Output(bytes) => {
            let _ = sink_tx.send(bytes);
            false
        }
        ServerEvent::Notice(notice) => {
            let _ = sink_tx.send(notice.to_ansi().into_bytes());
            false
        }
        ServerEvent::Exited { pid, code } => {
            let suffix = match code {
                Some(c) => format!(" with code {c}"),
                None => String::new(),
            };
            let notice = Notice::Message(format!("---(server pid {pid} exited{suffix})---"));
            let _ = sink_tx.send(notice.to_ansi().into_bytes());
            true
        }
    }
}

/// Headless mode: launch immediately, stream the sink to stdout, stop on
/// Ctrl-C, exit when the child exits.
async fn run_text(args: Cli) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (sink_tx, sink_handle) = spawn_sink_writer();

    let mut supervisor = Supervisor::new(
        args.server_bin.clone(),
        Box::new(PtySpawner::default()),
        event_tx,
    );

    if let Err(e) = supervisor.start(&build_params(&args)) {
        // The announcement and failure notice are already queued; flush them.
        while let Ok(ev) = event_rx.try_recv() {
            forward_event(&sink_tx, ev);
        }
        drop(sink_tx);
        let _ = sink_handle.await;
        return Err(e).context("start server");
    }

    let mut stop_requested = false;
    loop {
        tokio::select! {
            maybe_ev = event_rx.recv() => {
                match maybe_ev {
                    Some(ev) => {
                        if forward_event(&sink_tx, ev) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c(), if !stop_requested => {
                stop_requested = true;
                let _ = supervisor.stop();
            }
            // Grace window after a stop request; a server that ignores SIGINT
            // is left running rather than force-killed.
            _ = tokio::time::sleep(Duration::from_secs(3)), if stop_requested => {
                break;
            }
        }
    }

    drop(supervisor);
    drop(sink_tx);
    let _ = sink_handle.await;
    Ok(())
}
