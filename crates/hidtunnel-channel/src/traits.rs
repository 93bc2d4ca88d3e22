use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::{ChannelError, Result};
use crate::subchannel::{SubChannel, RECEIVER_PRODUCT_ID, RECEIVER_VENDOR_ID};

/// A duplex channel of fixed-length reports.
///
/// Every successful write transfers exactly one report. Reads may return
/// fewer bytes than [`report_length`](ReportChannel::report_length); callers
/// decide whether a short report is usable.
pub trait ReportChannel {
    /// Fixed report length of this channel, in bytes.
    fn report_length(&self) -> usize;

    /// Read the next report.
    ///
    /// Returns `Ok(None)` when a read timeout is configured and expires
    /// before a report arrives.
    fn read_report(&mut self) -> Result<Option<Bytes>>;

    /// Write one report and flush it to the device.
    fn write_report(&mut self, report: &[u8]) -> Result<()>;
}

impl<C: ReportChannel + ?Sized> ReportChannel for Box<C> {
    fn report_length(&self) -> usize {
        (**self).report_length()
    }

    fn read_report(&mut self) -> Result<Option<Bytes>> {
        (**self).read_report()
    }

    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        (**self).write_report(report)
    }
}

impl<C: ReportChannel + ?Sized> ReportChannel for &mut C {
    fn report_length(&self) -> usize {
        (**self).report_length()
    }

    fn read_report(&mut self) -> Result<Option<Bytes>> {
        (**self).read_report()
    }

    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        (**self).write_report(report)
    }
}

/// Selection and I/O settings for opening a report channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// USB vendor ID to match.
    pub vendor_id: u16,
    /// USB product ID to match.
    pub product_id: u16,
    /// Report length that must be declared for both input and output.
    pub report_length: usize,
    /// Upper bound for a single blocking read. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
}

impl ChannelConfig {
    /// Config for one sub-channel of the default Unifying receiver.
    pub fn receiver(sub: SubChannel) -> Self {
        Self {
            report_length: sub.report_length(),
            ..Self::default()
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            vendor_id: RECEIVER_VENDOR_ID,
            product_id: RECEIVER_PRODUCT_ID,
            report_length: SubChannel::HidppLong.report_length(),
            read_timeout: Some(Duration::from_millis(100)),
        }
    }
}

/// A report channel backed by an open HID device node.
pub struct HidReportChannel {
    file: File,
    path: PathBuf,
    report_length: usize,
    read_timeout: Option<Duration>,
    buf: BytesMut,
}

impl HidReportChannel {
    /// Wrap an already opened device node.
    pub fn from_file(
        file: File,
        path: impl Into<PathBuf>,
        report_length: usize,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            file,
            path: path.into(),
            report_length,
            read_timeout,
            buf: BytesMut::with_capacity(report_length),
        }
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn wait_readable(&self) -> Result<bool> {
        use std::os::fd::AsRawFd;

        let Some(timeout) = self.read_timeout else {
            return Ok(true);
        };
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: `pfd` is a valid, writable pollfd and the count passed is 1;
            // the descriptor stays open for the lifetime of `self.file`.
            let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
            if rc >= 0 {
                return Ok(rc > 0);
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(ChannelError::Io(err));
            }
        }
    }

    #[cfg(not(unix))]
    fn wait_readable(&self) -> Result<bool> {
        Ok(true)
    }
}

impl ReportChannel for HidReportChannel {
    fn report_length(&self) -> usize {
        self.report_length
    }

    fn read_report(&mut self) -> Result<Option<Bytes>> {
        if !self.wait_readable()? {
            return Ok(None);
        }

        self.buf.clear();
        self.buf.resize(self.report_length, 0);
        loop {
            match self.file.read(&mut self.buf[..]) {
                Ok(n) => {
                    self.buf.truncate(n);
                    tracing::trace!(len = n, path = ?self.path, "report read");
                    return Ok(Some(self.buf.split().freeze()));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
    }

    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        if report.len() != self.report_length {
            return Err(ChannelError::WrongLength {
                len: report.len(),
                expected: self.report_length,
            });
        }

        loop {
            match self.file.write_all(report) {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::Io(err)),
            }
        }
        self.file.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for HidReportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidReportChannel")
            .field("path", &self.path)
            .field("report_length", &self.report_length)
            .finish()
    }
}
