//! Stop-and-wait transport session.
//!
//! This is the layer that turns a report channel and a shell into a
//! tunnel. Each inbound report is answered with exactly one outbound report;
//! sequence and ack numbers are 2 bits wide and there is at most one
//! unacknowledged outbound frame.

pub mod arq;
pub mod config;
pub mod error;
pub mod session;

pub use arq::{ArqState, Step};
pub use config::{SessionConfig, DEFAULT_POLL_INTERVAL};
pub use error::{Result, SessionError};
pub use session::{Direction, Session, SessionStats};
