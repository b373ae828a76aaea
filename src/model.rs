use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_TIMEOUT: u64 = 0;
pub const DEFAULT_DATABASES: u32 = 16;
pub const DEFAULT_DBFILENAME: &str = "dump.rdb";

pub const DATABASES_MIN: u32 = 1;
pub const DATABASES_MAX: u32 = 99;

/// Parameters handed to the server on its command line.
///
/// Host, port, timeout and dbfilename are free text passed through unvalidated;
/// only the database count carries a range (1-99).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    pub host: String,
    pub port: String,
    pub timeout: String,
    pub databases: u32,
    pub dbfilename: String,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            timeout: DEFAULT_TIMEOUT.to_string(),
            databases: DEFAULT_DATABASES,
            dbfilename: DEFAULT_DBFILENAME.to_string(),
        }
    }
}

impl LaunchParams {
    /// Clamp the database count into its valid range.
    pub fn normalized(mut self) -> Self {
        self.databases = self.databases.clamp(DATABASES_MIN, DATABASES_MAX);
        self
    }

    /// Flags for the server binary, in the fixed order the server expects them.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--bind".into(),
            self.host.clone(),
            "--port".into(),
            self.port.clone(),
            "--timeout".into(),
            self.timeout.clone(),
            "--databases".into(),
            self.databases.to_string(),
            "--dbfilename".into(),
            self.dbfilename.clone(),
        ]
    }

    /// Full command line including the binary path, for announcement.
    pub fn command_line(&self, program: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(11);
        argv.push(program.to_string());
        argv.extend(self.to_args());
        argv
    }
}

/// Events emitted by the supervisor and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Announced command line, emitted before the spawn is attempted.
    CommandLine(Vec<String>),
    Started {
        pid: u32,
    },
    /// Raw child output from the PTY, ANSI sequences included.
    Output(Vec<u8>),
    Notice(Notice),
    /// Observed child exit, reported by the wait thread.
    Exited {
        pid: u32,
        code: Option<i32>,
    },
}

/// Status notices written to the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AlreadyRunning,
    NotRunning,
    Killed,
    SpawnFailed(String),
    Message(String),
}

impl Notice {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            Notice::AlreadyRunning => "---(server is already running)---".to_string(),
            Notice::NotRunning => "---(server is not yet running)---".to_string(),
            Notice::Killed => "---(killed)---".to_string(),
            Notice::SpawnFailed(reason) => format!("---(failed to start server: {reason})---"),
            Notice::Message(msg) => msg.clone(),
        }
    }

    /// ANSI-colored rendition for raw byte sinks (headless mode).
    pub fn to_ansi(&self) -> String {
        match self {
            Notice::AlreadyRunning | Notice::NotRunning | Notice::SpawnFailed(_) => {
                format!("\x1b[1;31m{}\x1b[0m\r\n", self.to_message())
            }
            Notice::Killed => format!("\x1b[1;33m{}\x1b[0m\r\n", self.to_message()),
            Notice::Message(_) => format!("{}\r\n", self.to_message()),
        }
    }
}

/// ANSI-colored command-line announcement: each token in green, space-separated.
pub fn ansi_command_line(argv: &[String]) -> String {
    let mut out = String::new();
    for token in argv {
        out.push_str("\x1b[0;32m");
        out.push_str(token);
        out.push(' ');
    }
    out.push_str("\x1b[0m\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_build_exact_argument_sequence() {
        let argv = LaunchParams::default().command_line("redis-server");
        assert_eq!(
            argv,
            vec![
                "redis-server",
                "--bind",
                "127.0.0.1",
                "--port",
                "6379",
                "--timeout",
                "0",
                "--databases",
                "16",
                "--dbfilename",
                "dump.rdb",
            ]
        );
    }

    #[test]
    fn database_count_boundaries_render_without_truncation() {
        for n in [DATABASES_MIN, DATABASES_MAX] {
            let params = LaunchParams {
                databases: n,
                ..Default::default()
            }
            .normalized();
            let args = params.to_args();
            let at = args.iter().position(|a| a == "--databases").unwrap();
            assert_eq!(args[at + 1], n.to_string());
            assert_eq!(args[at + 2], "--dbfilename");
        }
    }

    #[test]
    fn out_of_range_database_count_clamps_and_keeps_neighbors_intact() {
        let params = LaunchParams {
            databases: 12_345,
            ..Default::default()
        }
        .normalized();
        let args = params.to_args();
        let at = args.iter().position(|a| a == "--databases").unwrap();
        assert_eq!(args[at + 1], "99");
        assert_eq!(args[at + 2], "--dbfilename");
        assert_eq!(args[at + 3], "dump.rdb");

        let params = LaunchParams {
            databases: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(params.databases, 1);
    }

    #[test]
    fn ansi_notice_strings_match_sink_contract() {
        assert_eq!(
            Notice::AlreadyRunning.to_ansi(),
            "\x1b[1;31m---(server is already running)---\x1b[0m\r\n"
        );
        assert_eq!(
            Notice::NotRunning.to_ansi(),
            "\x1b[1;31m---(server is not yet running)---\x1b[0m\r\n"
        );
        assert_eq!(Notice::Killed.to_ansi(), "\x1b[1;33m---(killed)---\x1b[0m\r\n");
    }

    #[test]
    fn ansi_command_line_wraps_tokens_in_green() {
        let out = ansi_command_line(&["a".to_string(), "b".to_string()]);
        assert_eq!(out, "\x1b[0;32ma \x1b[0;32mb \x1b[0m\r\n");
    }
}
