//! Framed I/O over the HID gadget byte channel. [`HidTransport`] abstracts
//! "write 64 bytes / read up to 128 bytes" so the controller lifecycle and
//! its tests can run against an in-memory fake instead of a real gadget
//! device node, mirroring the teacher's trait-abstracted device access
//! (`TargetDeviceClient`, the `serialport::TTYPort` wrapper in
//! `drivers/oxp_tty`).

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;

use nix::fcntl::{fcntl, FcntlArg, OFlag};

use crate::error::GadgetError;

/// Total size of every outbound frame: 2-byte header plus 62-byte payload.
pub const FRAME_LEN: usize = 64;
/// Size of the payload portion of an outbound frame.
pub const PAYLOAD_LEN: usize = FRAME_LEN - 2;
/// Inbound frames are read in chunks up to this size.
pub const READ_CHUNK_LEN: usize = 128;

/// "Write 64 bytes / read up to 128 bytes" over the gadget channel. A
/// would-block condition on either side is recovered locally: a write drops
/// the frame, a read yields nothing for this iteration. Any other I/O error
/// is fatal.
pub trait HidTransport: Sized {
    /// Open the channel bound to `path`. For a real gadget node this opens
    /// and sets `O_NONBLOCK`; fakes may ignore `path` entirely.
    fn open(path: &str) -> Result<Self, GadgetError>;

    /// Write exactly `frame.len()` bytes. Returns `Ok(())` if the frame was
    /// written or silently dropped on would-block.
    fn write_raw(&self, frame: &[u8]) -> Result<(), GadgetError>;

    /// Blocking read of up to `READ_CHUNK_LEN` bytes. Returns `None` on
    /// would-block (no data available this iteration) or `Some(bytes)`
    /// otherwise.
    fn read_raw(&self) -> Result<Option<Vec<u8>>, GadgetError>;
}

/// Build a 64-byte frame: `[ack, cmd] ++ payload ++ zeros`. `payload` must
/// be at most [`PAYLOAD_LEN`] bytes.
pub fn build_frame(ack: u8, cmd: u8, payload: &[u8]) -> [u8; FRAME_LEN] {
    debug_assert!(payload.len() <= PAYLOAD_LEN);
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = ack;
    frame[1] = cmd;
    let n = payload.len().min(PAYLOAD_LEN);
    frame[2..2 + n].copy_from_slice(&payload[..n]);
    frame
}

/// Write a framed message to a transport, per §4.5's framing contract.
pub fn write_frame(
    transport: &impl HidTransport,
    ack: u8,
    cmd: u8,
    payload: &[u8],
) -> Result<(), GadgetError> {
    transport.write_raw(&build_frame(ack, cmd, payload))
}

/// A gadget channel backed by a real device node (e.g. `/dev/hidg0`),
/// opened non-blocking so neither the reader task nor the writer lock ever
/// parks the process on a disconnected host.
pub struct GadgetChannel {
    file: std::fs::File,
}

impl HidTransport for GadgetChannel {
    fn open(path: &str) -> Result<Self, GadgetError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| GadgetError::Open {
                path: path.to_string(),
                source,
            })?;

        let flags = OFlag::from_bits_truncate(fcntl(file.as_raw_fd(), FcntlArg::F_GETFL)?);
        fcntl(
            file.as_raw_fd(),
            FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK),
        )?;

        Ok(Self { file })
    }

    fn write_raw(&self, frame: &[u8]) -> Result<(), GadgetError> {
        match (&self.file).write_all(frame) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(GadgetError::Write(e)),
        }
    }

    fn read_raw(&self) -> Result<Option<Vec<u8>>, GadgetError> {
        let mut buf = [0u8; READ_CHUNK_LEN];
        match (&self.file).read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(buf[..n].to_vec())),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(GadgetError::Read(e)),
        }
    }
}

/// An in-memory fake transport for tests: a queue of inbound frames to
/// deliver and a log of every outbound frame written.
#[cfg(test)]
pub struct FakeTransport {
    pub inbound: std::sync::Mutex<std::collections::VecDeque<Vec<u8>>>,
    pub outbound: std::sync::Mutex<Vec<Vec<u8>>>,
}

#[cfg(test)]
impl FakeTransport {
    pub fn new() -> Self {
        Self {
            inbound: std::sync::Mutex::new(std::collections::VecDeque::new()),
            outbound: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn push_inbound(&self, frame: Vec<u8>) {
        self.inbound.lock().unwrap().push_back(frame);
    }
}

#[cfg(test)]
impl HidTransport for FakeTransport {
    fn open(_path: &str) -> Result<Self, GadgetError> {
        Ok(Self::new())
    }

    fn write_raw(&self, frame: &[u8]) -> Result<(), GadgetError> {
        self.outbound.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn read_raw(&self) -> Result<Option<Vec<u8>>, GadgetError> {
        Ok(self.inbound.lock().unwrap().pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_frame_is_exactly_64_bytes_for_any_payload_length() {
        for len in 0..=PAYLOAD_LEN {
            let payload = vec![0xaau8; len];
            let frame = build_frame(0x21, 0x05, &payload);
            assert_eq!(frame.len(), FRAME_LEN);
        }
    }

    #[test]
    fn build_frame_zero_pads_the_remainder() {
        let frame = build_frame(0x30, 0x01, &[0xaa, 0xbb]);
        assert_eq!(frame[0], 0x30);
        assert_eq!(frame[1], 0x01);
        assert_eq!(frame[2], 0xaa);
        assert_eq!(frame[3], 0xbb);
        assert!(frame[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn fake_transport_records_writes_and_replays_reads() {
        let fake = FakeTransport::new();
        write_frame(&fake, 0x21, 0x00, &[0x01, 0x02]).unwrap();
        assert_eq!(fake.outbound.lock().unwrap().len(), 1);

        fake.push_inbound(vec![0x80, 0x01]);
        let read = fake.read_raw().unwrap();
        assert_eq!(read, Some(vec![0x80, 0x01]));
        assert_eq!(fake.read_raw().unwrap(), None);
    }
}
