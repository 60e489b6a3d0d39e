//! Process runner for oracle binaries.
//!
//! Each invocation is launched as the leader of a fresh process group. When
//! its cancellation token fires or its wall-clock limit passes, the whole
//! group receives `SIGKILL`, so helper processes spawned by the oracle die
//! with it. The group is also swept after a normal exit to reap stragglers.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::oracle::OracleError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCommand {
    program: String,
    args: Vec<String>,
}

impl OracleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a shell-like command line on whitespace. No quoting support.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn fixed_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for OracleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub enum Completion {
    Exited(ProcessOutput),
    Cancelled,
    TimedOut,
}

enum Wait {
    Exited(ExitStatus),
    Cancelled,
    TimedOut,
}

/// Run `command` with `extra_args` appended until it exits, the token is
/// cancelled, or `timeout` elapses. The child is always reaped before this
/// returns.
pub fn run(
    command: &OracleCommand,
    extra_args: &[OsString],
    stdin: Option<Vec<u8>>,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<Completion, OracleError> {
    if cancel.is_cancelled() {
        return Ok(Completion::Cancelled);
    }
    let program = command.program().to_string();

    let mut cmd = Command::new(command.program());
    cmd.args(command.fixed_args())
        .args(extra_args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| OracleError::Launch {
        program: program.clone(),
        source,
    })?;
    debug!(program = %program, pid = child.id(), "launched oracle process");

    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(thread::spawn(move || pipe.write_all(&bytes))),
        _ => None,
    };
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let waited = wait_for(&mut child, cancel, timeout);
    let swept = kill_process_group(&mut child);
    let waited = match waited {
        Ok(wait) => wait,
        Err(source) => {
            let _ = child.wait();
            return Err(OracleError::Io { program, source });
        }
    };
    if !matches!(waited, Wait::Exited(_)) {
        child.wait().map_err(|source| OracleError::Io {
            program: program.clone(),
            source,
        })?;
    }
    swept.map_err(|source| OracleError::Signal {
        program: program.clone(),
        source,
    })?;

    if let Some(handle) = writer {
        match join_io(handle) {
            Ok(()) => {}
            // The oracle may exit without draining its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(source) if matches!(waited, Wait::Exited(_)) => {
                return Err(OracleError::Io { program, source });
            }
            Err(_) => {}
        }
    }
    let stdout = collect(stdout).map_err(|source| OracleError::Io {
        program: program.clone(),
        source,
    })?;
    let stderr = collect(stderr).map_err(|source| OracleError::Io {
        program: program.clone(),
        source,
    })?;

    match waited {
        Wait::Exited(status) => {
            debug!(program = %program, code = ?status.code(), "oracle process exited");
            Ok(Completion::Exited(ProcessOutput {
                code: status.code(),
                success: status.success(),
                stdout,
                stderr,
            }))
        }
        Wait::TimedOut => {
            warn!(program = %program, limit = ?timeout, "oracle process killed after wall-clock limit");
            Ok(Completion::TimedOut)
        }
        Wait::Cancelled => {
            debug!(program = %program, "oracle process group killed on cancellation");
            Ok(Completion::Cancelled)
        }
    }
}

fn wait_for(
    child: &mut Child,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> io::Result<Wait> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Wait::Exited(status));
        }
        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            return Ok(Wait::TimedOut);
        }
        if cancel.wait_timeout(POLL_INTERVAL) {
            return Ok(Wait::Cancelled);
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn collect(reader: Option<JoinHandle<io::Result<String>>>) -> io::Result<String> {
    match reader {
        Some(handle) => join_io(handle),
        None => Ok(String::new()),
    }
}

fn join_io<T>(handle: JoinHandle<io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "pipe thread panicked")))
}

#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg takes plain integers and touches no memory of ours. The
    // group id is the pid of a child we spawned as group leader.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
        _ => Ok(()),
    }
}
