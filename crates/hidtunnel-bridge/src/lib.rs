//! Bridge between a child process's stdio and the report transport.
//!
//! Reader threads chop the child's stdout (and optionally stderr) into
//! chunks of at most 16 bytes and push them onto one shared FIFO. The
//! transport session pops one chunk per acknowledged frame and writes
//! inbound payload straight to the child's stdin.

pub mod bridge;
pub mod error;
pub mod process;
pub mod queue;

pub use bridge::{OutputBridge, ShellEndpoint, StreamKind, CHUNK_SIZE};
pub use error::{BridgeError, Result};
pub use process::{ProcessHandle, ShellCommand, ShellProcess};
pub use queue::OutputQueue;
