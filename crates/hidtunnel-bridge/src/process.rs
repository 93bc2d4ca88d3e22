use std::io::{ErrorKind, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// What the bridge needs from a running child process.
pub trait ProcessHandle: Send + Sync {
    /// Write `data` to the child's stdin and flush.
    ///
    /// A no-op once the child has exited.
    fn write_stdin(&self, data: &[u8]) -> Result<()>;

    /// True once the child has terminated.
    fn has_exited(&self) -> bool;

    /// Terminate the child and reap it.
    fn kill(&self) -> Result<()>;
}

/// Command line of the shell to tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Also forward the child's stderr.
    pub capture_stderr: bool,
}

impl ShellCommand {
    /// Command running `program` with no arguments, capturing stderr.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_stderr: true,
        }
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether stderr is forwarded.
    pub fn with_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Platform default interactive shell.
    pub fn default_program() -> &'static str {
        if cfg!(windows) {
            "cmd.exe"
        } else {
            "/bin/sh"
        }
    }
}

impl Default for ShellCommand {
    fn default() -> Self {
        Self::new(Self::default_program())
    }
}

/// A spawned shell with piped stdio.
pub struct ShellProcess {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<Option<ChildStdout>>,
    stderr: Mutex<Option<ChildStderr>>,
    exited: AtomicBool,
    pid: u32,
}

impl ShellProcess {
    /// Start `command` with stdin/stdout piped, and stderr piped if requested.
    pub fn spawn(command: &ShellCommand) -> Result<Self> {
        let stderr = if command.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let pid = child.id();
        info!(program = %command.program, pid, "spawned shell");

        Ok(Self {
            stdin: Mutex::new(child.stdin.take()),
            stdout: Mutex::new(child.stdout.take()),
            stderr: Mutex::new(child.stderr.take()),
            child: Mutex::new(child),
            exited: AtomicBool::new(false),
            pid,
        })
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// Take the stdout pipe. Returns `MissingPipe` if already taken.
    pub fn take_stdout(&self) -> Result<ChildStdout> {
        lock(&self.stdout)
            .take()
            .ok_or(BridgeError::MissingPipe("stdout"))
    }

    /// Take the stderr pipe, if it was captured and not yet taken.
    pub fn take_stderr(&self) -> Option<ChildStderr> {
        lock(&self.stderr).take()
    }
}

impl ProcessHandle for ShellProcess {
    fn write_stdin(&self, data: &[u8]) -> Result<()> {
        if self.has_exited() {
            return Ok(());
        }

        let mut stdin = lock(&self.stdin);
        let Some(pipe) = stdin.as_mut() else {
            return Err(BridgeError::MissingPipe("stdin"));
        };

        match pipe.write_all(data).and_then(|()| pipe.flush()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                debug!(pid = self.pid, "stdin closed by child");
                Ok(())
            }
            Err(err) => Err(BridgeError::Io(err)),
        }
    }

    fn has_exited(&self) -> bool {
        if self.exited.load(Ordering::SeqCst) {
            return true;
        }

        let exited = match lock(&self.child).try_wait() {
            Ok(Some(status)) => {
                info!(pid = self.pid, %status, "shell exited");
                true
            }
            Ok(None) => false,
            Err(err) => {
                debug!(pid = self.pid, error = %err, "try_wait failed, treating shell as exited");
                true
            }
        };
        if exited {
            self.exited.store(true, Ordering::SeqCst);
        }
        exited
    }

    fn kill(&self) -> Result<()> {
        let mut child = lock(&self.child);
        match child.kill() {
            Ok(()) => {}
            // already exited
            Err(err) if err.kind() == ErrorKind::InvalidInput => {}
            Err(err) => return Err(BridgeError::Io(err)),
        }
        child.wait()?;
        self.exited.store(true, Ordering::SeqCst);
        debug!(pid = self.pid, "shell killed");
        Ok(())
    }
}

impl std::fmt::Debug for ShellProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellProcess")
            .field("pid", &self.pid)
            .field("exited", &self.exited.load(Ordering::SeqCst))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
