use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

/// Timeout applied to every probe unless the configuration says otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const TIMED_OUT_MESSAGE: &str = "Command timed out";

/// What to run: an argument vector (no shell involved) or a fixed shell script.
///
/// Shell scripts must never contain request-derived text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Argv(Vec<String>),
    Shell(String),
}

impl Invocation {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::Argv(args.into_iter().map(Into::into).collect())
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Invocation::Shell(script.into())
    }

    /// Program name used in logs.
    pub fn program(&self) -> &str {
        match self {
            Invocation::Argv(args) => args.first().map(String::as_str).unwrap_or(""),
            Invocation::Shell(_) => "sh",
        }
    }

    fn to_command(&self) -> Option<Command> {
        match self {
            Invocation::Argv(args) => {
                let (program, rest) = args.split_first()?;
                let mut cmd = Command::new(program);
                cmd.args(rest);
                Some(cmd)
            }
            Invocation::Shell(script) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                // Own process group so a timeout can take the whole pipeline down.
                #[cfg(unix)]
                cmd.process_group(0);
                Some(cmd)
            }
        }
    }
}

/// Outcome of one external command. Failures to spawn or finish in time are
/// folded into the same shape with `exit_code == -1`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: -1,
        }
    }

    pub fn timed_out() -> Self {
        Self::failure(TIMED_OUT_MESSAGE)
    }

    /// Stdout of a successful run, trimmed. `None` when the command failed.
    pub fn success_output(&self) -> Option<&str> {
        self.succeeded.then(|| self.stdout.trim())
    }
}

/// Run `invocation` to completion or until `timeout` elapses.
///
/// On timeout the child is killed and reaped before returning. Shell
/// invocations additionally have their process group killed.
pub async fn execute(invocation: &Invocation, timeout: Duration) -> CommandResult {
    let Some(mut cmd) = invocation.to_command() else {
        return CommandResult::failure("empty command");
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %invocation.program(), "spawning probe command");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %invocation.program(), error = %e, "failed to spawn command");
            return CommandResult::failure(e.to_string());
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let outcome = {
        let finish = async {
            let (out, err, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());
            (out, err, status)
        };
        time::timeout(timeout, finish).await
    };

    match outcome {
        Ok((out, err, Ok(status))) => {
            let exit_code = status.code().unwrap_or(-1);
            CommandResult {
                succeeded: exit_code == 0,
                stdout: String::from_utf8_lossy(&out).into_owned(),
                stderr: String::from_utf8_lossy(&err).into_owned(),
                exit_code,
            }
        }
        Ok((_, _, Err(e))) => {
            warn!(program = %invocation.program(), error = %e, "failed to wait for command");
            CommandResult::failure(e.to_string())
        }
        Err(_) => {
            warn!(
                program = %invocation.program(),
                timeout_ms = timeout.as_millis() as u64,
                "command timed out; killing"
            );
            #[cfg(unix)]
            if let (Invocation::Shell(_), Some(pid)) = (invocation, child.id()) {
                kill_process_group(pid).await;
            }
            if let Err(e) = child.kill().await {
                debug!(error = %e, "kill after timeout failed");
            }
            CommandResult::timed_out()
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let target = format!("-{pgid}");
    let res = Command::new("kill")
        .args(["-KILL", "--", target.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = res {
        debug!(pgid, error = %e, "failed to signal process group");
    }
}

/// Seam between the probers and the host. Production code uses
/// [`SystemRunner`]; tests substitute canned output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> CommandResult;
}

/// Runs commands on the local host with a fixed per-call timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> CommandResult {
        execute(invocation, self.timeout).await
    }
}
