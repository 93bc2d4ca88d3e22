//! Interactive shell tunnelled through a Logitech Unifying receiver.
//!
//! A peer on the far side of the receiver exchanges 20-byte HID++ long
//! reports with this host. hidtunnel runs a stop-and-wait protocol over
//! those reports and bridges the payload to a local shell's stdio.
//!
//! # Crate Structure
//!
//! - [`channel`]: fixed-length HID report channels and device discovery
//! - [`frame`]: encoding of the 20-byte tunnel report
//! - [`bridge`]: child process stdio and the shell output queue
//! - [`session`]: the stop-and-wait session tying a channel to a shell

/// Re-export channel types.
pub mod channel {
    pub use hidtunnel_channel::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hidtunnel_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use hidtunnel_bridge::*;
}

/// Re-export session types.
pub mod session {
    pub use hidtunnel_session::*;
}
