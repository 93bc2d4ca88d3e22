use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hidtunnel_frame::MAX_PAYLOAD;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::process::{ProcessHandle, ShellProcess};
use crate::queue::OutputQueue;

/// Largest chunk a reader thread enqueues, one frame's worth of payload.
pub const CHUNK_SIZE: usize = MAX_PAYLOAD;

/// The shell as seen by the transport session.
pub trait ShellEndpoint {
    /// False once the shell has exited; the session stops polling then.
    fn is_running(&self) -> bool;

    /// Deliver inbound payload to the shell's stdin.
    fn write_stdin(&self, data: &[u8]) -> Result<()>;

    /// Pop the next chunk of shell output, if any.
    fn take_chunk(&self) -> Option<Bytes>;

    /// Number of output chunks waiting to be sent.
    fn queue_depth(&self) -> usize;

    /// True if [`take_chunk`](ShellEndpoint::take_chunk) would return a chunk.
    fn has_output(&self) -> bool {
        self.queue_depth() > 0
    }
}

/// Which child stream a reader thread drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Couples a child process with the reader threads draining its output.
///
/// Readers stop at end of stream, not at process exit, so output the child
/// wrote just before exiting still reaches the queue. A background job that
/// inherited the pipes keeps them open, and with them its reader; see
/// [`join_readers_timeout`](OutputBridge::join_readers_timeout).
pub struct OutputBridge {
    process: Arc<dyn ProcessHandle>,
    queue: OutputQueue,
    readers: Vec<JoinHandle<()>>,
}

impl OutputBridge {
    /// Start reader threads for `process`'s stdout, and stderr if requested.
    pub fn start(process: ShellProcess, capture_stderr: bool) -> Result<Self> {
        let stdout = process.take_stdout()?;
        let stderr = if capture_stderr {
            process.take_stderr()
        } else {
            None
        };

        let mut sources: Vec<(StreamKind, Box<dyn Read + Send>)> =
            vec![(StreamKind::Stdout, Box::new(stdout))];
        if let Some(stderr) = stderr {
            sources.push((StreamKind::Stderr, Box::new(stderr)));
        }

        Ok(Self::from_parts(Arc::new(process), sources))
    }

    /// Build a bridge over arbitrary output sources.
    pub fn from_parts(
        process: Arc<dyn ProcessHandle>,
        sources: Vec<(StreamKind, Box<dyn Read + Send>)>,
    ) -> Self {
        let queue = OutputQueue::new();
        let readers = sources
            .into_iter()
            .map(|(kind, source)| {
                let queue = queue.clone();
                let process = Arc::clone(&process);
                std::thread::spawn(move || pump(kind, source, &queue, process.as_ref()))
            })
            .collect();

        Self {
            process,
            queue,
            readers,
        }
    }

    /// Shared output queue.
    pub fn queue(&self) -> &OutputQueue {
        &self.queue
    }

    /// The bridged process.
    pub fn process(&self) -> &Arc<dyn ProcessHandle> {
        &self.process
    }

    /// Kill the process. Reader threads wind down on their own once the
    /// pipes close.
    pub fn terminate(&self) -> Result<()> {
        self.process.kill()
    }

    /// Number of reader threads still draining a stream.
    pub fn active_readers(&self) -> usize {
        self.readers.iter().filter(|r| !r.is_finished()).count()
    }

    /// Join readers that finish within `timeout` and return how many are
    /// still running. Those are detached when the bridge is dropped.
    pub fn join_readers_timeout(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                self.readers.drain(..).partition(|r| r.is_finished());
            for reader in finished {
                if reader.join().is_err() {
                    warn!("output reader thread panicked");
                }
            }
            self.readers = running;

            if self.readers.is_empty() || Instant::now() >= deadline {
                return self.readers.len();
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Wait for all reader threads to finish.
    ///
    /// Readers finish once their stream reaches end of file, which happens
    /// when the child (and anything it spawned) has exited.
    pub fn join_readers(&mut self) {
        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                warn!("output reader thread panicked");
            }
        }
    }
}

impl ShellEndpoint for OutputBridge {
    fn is_running(&self) -> bool {
        !self.process.has_exited()
    }

    fn write_stdin(&self, data: &[u8]) -> Result<()> {
        self.process.write_stdin(data)
    }

    fn take_chunk(&self) -> Option<Bytes> {
        self.queue.pop()
    }

    fn queue_depth(&self) -> usize {
        self.queue.depth()
    }
}

impl std::fmt::Debug for OutputBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputBridge")
            .field("queue_depth", &self.queue.depth())
            .field("readers", &self.readers.len())
            .finish()
    }
}

/// Reader loop: move at most [`CHUNK_SIZE`] bytes per read into the queue.
fn pump(
    kind: StreamKind,
    mut source: Box<dyn Read + Send>,
    queue: &OutputQueue,
    process: &dyn ProcessHandle,
) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match source.read(&mut buf) {
            Ok(0) => {
                debug!(stream = kind.name(), "end of stream");
                break;
            }
            Ok(n) => {
                trace!(stream = kind.name(), len = n, "queued output chunk");
                queue.push(Bytes::copy_from_slice(&buf[..n]));
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                if !process.has_exited() {
                    warn!(stream = kind.name(), error = %err, "output read failed");
                }
                break;
            }
        }
    }
}
