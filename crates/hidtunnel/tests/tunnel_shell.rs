#![cfg(unix)]

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;
use hidtunnel::bridge::{OutputBridge, ShellCommand, ShellEndpoint, ShellProcess};
use hidtunnel::channel::{ReportChannel, Result};
use hidtunnel::frame::{check_report, decode, encode, Frame, REPORT_LEN};
use hidtunnel::session::Session;

/// Plays the far side of the link: sends queued payloads one frame at a
/// time and retransmits until the host acknowledges each one.
struct PeerSim {
    outgoing: VecDeque<Bytes>,
    seq: u8,
    last_host_seq: u8,
    received: Vec<u8>,
    writes: usize,
    drop_every_other_reply: bool,
}

impl PeerSim {
    fn new(commands: &[&'static [u8]]) -> Self {
        Self {
            outgoing: commands.iter().map(|c| Bytes::from_static(c)).collect(),
            seq: 0,
            last_host_seq: 3,
            received: Vec::new(),
            writes: 0,
            drop_every_other_reply: false,
        }
    }

    fn lossy(mut self) -> Self {
        self.drop_every_other_reply = true;
        self
    }

    fn received_text(&self) -> String {
        String::from_utf8_lossy(&self.received).into_owned()
    }
}

impl ReportChannel for PeerSim {
    fn report_length(&self) -> usize {
        REPORT_LEN
    }

    fn read_report(&mut self) -> Result<Option<Bytes>> {
        let payload = self.outgoing.front().cloned().unwrap_or_default();
        let frame = Frame::with_payload(0x01, self.seq, self.last_host_seq, payload);
        Ok(Some(Bytes::copy_from_slice(&encode(&frame))))
    }

    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        self.writes += 1;
        if self.drop_every_other_reply && self.writes % 2 == 1 {
            return Ok(());
        }

        let reply = decode(check_report(report).expect("host sends well-formed reports"));
        if reply.ack == self.seq {
            self.outgoing.pop_front();
            self.seq = (self.seq + 1) % 4;
        }
        if reply.sequence != self.last_host_seq {
            self.received.extend_from_slice(&reply.payload);
            self.last_host_seq = reply.sequence;
        }
        Ok(())
    }
}

fn poll_until<S: ShellEndpoint>(session: &mut Session<PeerSim, S>, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !session.channel().received_text().contains(needle) {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {needle:?}, got {:?}",
            session.channel().received_text()
        );
        session.poll_once().expect("poll should succeed");
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn start_shell() -> OutputBridge {
    let process = ShellProcess::spawn(&ShellCommand::new("/bin/sh")).expect("spawn /bin/sh");
    OutputBridge::start(process, true).expect("bridge /bin/sh")
}

#[test]
fn command_output_travels_back_through_the_tunnel() {
    let peer = PeerSim::new(&[b"echo tunnel-ok\n"]);
    let mut session = Session::new(peer, start_shell());

    poll_until(&mut session, "tunnel-ok\n");

    assert_eq!(session.stats().duplicates, 0);
    assert_eq!(session.stats().bytes_delivered, 15);
    session.shell().terminate().unwrap();
}

#[test]
fn long_commands_span_several_frames() {
    // two full frames and a short one
    let peer = PeerSim::new(&[b"echo 0123456789a", b"bcdefghijklmnopq", b"rstuvw\n"]);
    let mut session = Session::new(peer, start_shell());

    poll_until(&mut session, "0123456789abcdefghijklmnopqrstuvw\n");
    session.shell().terminate().unwrap();
}

#[test]
fn lost_replies_do_not_duplicate_commands() {
    let peer = PeerSim::new(&[b"echo once\n", b"echo twice\n"]).lossy();
    let mut session = Session::new(peer, start_shell());

    poll_until(&mut session, "twice\n");

    let text = session.channel().received_text();
    assert_eq!(text.matches("once\n").count(), 1);
    assert_eq!(text.matches("twice\n").count(), 1);
    assert!(session.stats().duplicates > 0);
    assert!(session.stats().retransmissions > 0);
    session.shell().terminate().unwrap();
}

#[test]
fn stderr_is_tunnelled_too() {
    let peer = PeerSim::new(&[b"echo oops >&2\n"]);
    let mut session = Session::new(peer, start_shell());

    poll_until(&mut session, "oops\n");
    session.shell().terminate().unwrap();
}

#[test]
fn run_returns_once_the_shell_exits() {
    let process = ShellProcess::spawn(&ShellCommand::new("/bin/sh")).unwrap();
    let bridge = OutputBridge::start(process, true).unwrap();
    let peer = PeerSim::new(&[b"exit 0\n"]);
    let mut session = Session::new(peer, bridge);

    let stats = session.run().expect("session should end cleanly");

    assert!(!session.shell().is_running());
    assert_eq!(stats.bytes_delivered, 7);
}
