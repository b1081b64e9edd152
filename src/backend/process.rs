use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Exit code reported when a run is killed at its deadline
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported when the tool could not be started
pub const SPAWN_FAILED_CODE: i32 = 127;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long to keep reading pipes after a kill
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// External tool invocation prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    #[serde(default = "default_command")]
    pub command: String,
    /// Leading arguments placed before the per-call ones
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_command() -> String {
    "ffmpeg".to_string()
}

impl ToolCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn ffmpeg() -> Self {
        Self::new(default_command())
    }
}

/// Finished (or abandoned) tool run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub code: i32,
    /// stdout followed by stderr
    pub log: String,
    pub timed_out: bool,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Reader output, or nothing if the pipe is still held open at `until`.
/// Processes the tool spawned can keep a pipe open past its own exit; the
/// reader thread is then left behind rather than blocking the caller.
fn collect(rx: Option<Receiver<String>>, until: Instant) -> String {
    rx.and_then(|rx| {
        rx.recv_timeout(until.saturating_duration_since(Instant::now()))
            .ok()
    })
    .unwrap_or_default()
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Failed(std::io::Error),
}

fn wait_until(child: &mut Child, deadline: Instant) -> Waited {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Waited::Exited(status),
            Ok(None) if Instant::now() >= deadline => return Waited::TimedOut,
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Waited::Failed(e),
        }
    }
}

/// Run `tool` with `args`, blocking until it exits or `timeout` elapses.
pub fn run_with_timeout(tool: &ToolCommand, args: &[String], timeout: Duration) -> ProcessOutput {
    debug!(command = %tool.command, ?args, "spawning tool");

    let mut child = match Command::new(&tool.command)
        .args(&tool.args)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(command = %tool.command, error = %e, "failed to start tool");
            return ProcessOutput {
                code: SPAWN_FAILED_CODE,
                log: format!("failed to start {}: {}", tool.command, e),
                timed_out: false,
            };
        }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let waited = wait_until(&mut child, deadline);
    let drain_until = if matches!(waited, Waited::Exited(_)) {
        deadline.max(Instant::now() + DRAIN_GRACE)
    } else {
        let _ = child.kill();
        let _ = child.wait();
        Instant::now() + DRAIN_GRACE
    };

    let mut log = collect(stdout, drain_until);
    log.push('\n');
    log.push_str(&collect(stderr, drain_until));

    match waited {
        Waited::Exited(status) => ProcessOutput {
            code: status.code().unwrap_or(-1),
            log,
            timed_out: false,
        },
        Waited::TimedOut => {
            warn!(command = %tool.command, timeout_secs = timeout.as_secs_f64(), "tool timed out");
            log.push_str(&format!("\ntimed out after {}s", timeout.as_secs_f64()));
            ProcessOutput {
                code: TIMEOUT_EXIT_CODE,
                log,
                timed_out: true,
            }
        }
        Waited::Failed(e) => {
            log.push_str(&format!("\nfailed waiting for {}: {}", tool.command, e));
            ProcessOutput {
                code: -1,
                log,
                timed_out: false,
            }
        }
    }
}
