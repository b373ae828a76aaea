//! PTY-backed process spawning.
//!
//! The server runs attached to a pseudo-terminal so its output (ANSI colors
//! included) streams to the sink exactly as it would in a real terminal.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::UnboundedSender;

use crate::model::ServerEvent;
use crate::supervisor::{ServerHandle, Spawn};

const READ_CHUNK_SIZE: usize = 8 * 1024;

pub struct PtySpawner {
    rows: u16,
    cols: u16,
}

impl Default for PtySpawner {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

struct PtyServerHandle {
    pid: u32,
    alive: Arc<AtomicBool>,
    #[cfg(not(unix))]
    killer: Box<dyn portable_pty::ChildKiller + Send + Sync>,
    // Keeps the PTY open for the child's lifetime; dropping the master would
    // close the reader mid-stream.
    _master: Box<dyn MasterPty + Send>,
}

impl ServerHandle for PtyServerHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> Result<()> {
        // SIGINT, not SIGKILL: the server flushes and shuts down gracefully.
        let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGINT) };
        if rc == -1 {
            return Err(std::io::Error::last_os_error())
                .with_context(|| format!("send SIGINT to pid {}", self.pid));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> Result<()> {
        self.killer
            .kill()
            .with_context(|| format!("terminate pid {}", self.pid))
    }
}

impl Spawn for PtySpawner {
    fn spawn(
        &self,
        program: &str,
        args: &[String],
        events: UnboundedSender<ServerEvent>,
    ) -> Result<Box<dyn ServerHandle>> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: self.rows,
                cols: self.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("open pty")?;

        let mut cmd = CommandBuilder::new(program);
        for arg in args {
            cmd.arg(arg);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("spawn {program}"))?;
        drop(pair.slave);

        let pid = child
            .process_id()
            .ok_or_else(|| anyhow!("spawned server has no pid"))?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("clone pty reader")?;

        let alive = Arc::new(AtomicBool::new(true));
        #[cfg(not(unix))]
        let killer = child.clone_killer();
        spawn_read_loop(reader, events.clone());
        spawn_wait_loop(child, pid, Arc::clone(&alive), events);

        Ok(Box::new(PtyServerHandle {
            pid,
            alive,
            #[cfg(not(unix))]
            killer,
            _master: pair.master,
        }))
    }
}

/// Forward raw PTY output chunks to the event channel until EOF.
fn spawn_read_loop(mut reader: Box<dyn Read + Send>, events: UnboundedSender<ServerEvent>) {
    std::thread::spawn(move || {
        let mut buffer = [0_u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    if events.send(ServerEvent::Output(buffer[..read].to_vec())).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

/// Reap the child, flip the liveness flag, and report the exit.
fn spawn_wait_loop(
    mut child: Box<dyn Child + Send + Sync>,
    pid: u32,
    alive: Arc<AtomicBool>,
    events: UnboundedSender<ServerEvent>,
) {
    std::thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => Some(status.exit_code() as i32),
            Err(_) => None,
        };
        alive.store(false, Ordering::SeqCst);
        let _ = events.send(ServerEvent::Exited { pid, code });
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::{LaunchParams, Notice};
    use crate::supervisor::{StartOutcome, StopOutcome, Supervisor};
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::timeout;

    /// Collect PTY output until the needle shows up.
    async fn collect_output_until(
        rx: &mut UnboundedReceiver<ServerEvent>,
        needle: &str,
    ) -> String {
        timeout(Duration::from_secs(5), async {
            let mut collected = Vec::new();
            loop {
                match rx.recv().await.expect("event channel closed") {
                    ServerEvent::Output(chunk) => {
                        collected.extend_from_slice(&chunk);
                        if String::from_utf8_lossy(&collected).contains(needle) {
                            return String::from_utf8_lossy(&collected).into_owned();
                        }
                    }
                    _ => continue,
                }
            }
        })
        .await
        .expect("timed out waiting for PTY output")
    }

    async fn wait_for_exit(rx: &mut UnboundedReceiver<ServerEvent>) -> (u32, Option<i32>) {
        timeout(Duration::from_secs(5), async {
            loop {
                if let ServerEvent::Exited { pid, code } =
                    rx.recv().await.expect("event channel closed")
                {
                    return (pid, code);
                }
            }
        })
        .await
        .expect("timed out waiting for child exit")
    }

    /// Write a stand-in server script that echoes its arguments, handles
    /// SIGINT gracefully, and otherwise runs until interrupted.
    fn stand_in_server(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "redis-console-stand-in-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::write(
            &path,
            "#!/bin/sh\ntrap 'exit 0' INT\necho started \"$@\"\nwhile :; do sleep 0.1; done\n",
        )
        .expect("write stand-in server");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("mark stand-in server executable");
        path
    }

    #[tokio::test]
    async fn pty_spawn_streams_output_and_reports_exit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let spawner = PtySpawner::default();

        let mut handle = spawner
            .spawn(
                "sh",
                &["-c".to_string(), "echo ready; sleep 5".to_string()],
                tx,
            )
            .expect("spawn shell");
        assert!(handle.pid() > 0);
        assert!(handle.is_alive());

        let output = collect_output_until(&mut rx, "ready").await;
        assert!(output.contains("ready"));

        handle.interrupt().expect("send SIGINT");
        let (pid, _code) = wait_for_exit(&mut rx).await;
        assert_eq!(pid, handle.pid());
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn spawn_of_missing_binary_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let spawner = PtySpawner::default();

        let result = spawner.spawn("redis-console-definitely-missing-binary", &[], tx);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn supervisor_lifecycle_with_real_process() {
        let script = stand_in_server("lifecycle");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sup = Supervisor::new(
            script.to_string_lossy().into_owned(),
            Box::new(PtySpawner::default()),
            tx,
        );

        let outcome = sup.start(&LaunchParams::default()).expect("start server");
        let StartOutcome::Started { pid } = outcome else {
            panic!("expected a started outcome");
        };
        assert!(pid > 0);
        assert!(sup.is_running());

        // Announcement precedes any process output.
        let first = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event timeout")
            .expect("event channel closed");
        let ServerEvent::CommandLine(argv) = first else {
            panic!("expected the command-line announcement first");
        };
        assert_eq!(argv.len(), 11);
        assert_eq!(argv[1], "--bind");

        // The script saw the full flag set on its command line.
        let output = collect_output_until(&mut rx, "--dbfilename dump.rdb").await;
        assert!(output.contains("started --bind 127.0.0.1"));

        let stopped = sup.stop().expect("stop server");
        assert_eq!(stopped, StopOutcome::Stopped { pid });
        assert!(!sup.is_running());

        let (exited_pid, _code) = wait_for_exit(&mut rx).await;
        assert_eq!(exited_pid, pid);

        std::fs::remove_file(&script).ok();
    }

    #[tokio::test]
    async fn stop_after_self_exit_reports_instead_of_signalling() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sup = Supervisor::new("sh", Box::new(PtySpawner::default()), tx);

        // `sh` exits immediately: the flag set is not a valid shell script
        // invocation, which is exactly the self-exit scenario.
        sup.start(&LaunchParams::default()).expect("start");
        let (_pid, _code) = wait_for_exit(&mut rx).await;

        let outcome = sup.stop().expect("stop");
        assert!(matches!(outcome, StopOutcome::Stopped { .. }));
        assert!(!sup.is_running());

        // No kill notice: nothing was signalled.
        let mut saw_killed = false;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, ServerEvent::Notice(Notice::Killed)) {
                saw_killed = true;
            }
        }
        assert!(!saw_killed);
    }
}

