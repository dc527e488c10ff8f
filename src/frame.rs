//! Frame transfer: writing and reading complete frames on the bus.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::reader::FrameReader;
use crate::types::{FrameId, ProtectedId, BREAK_FIELD, SYNC_FIELD};
use crate::uart::SerialPort;
use crate::{
    checksum, ChecksumMismatchSnafu, ReadbackMismatchSnafu, Result, TransportTimeoutSnafu,
};

/// Line and timing parameters of the master.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bus speed in Baud.
    pub baud: u32,
    /// Window for receiving one complete frame.
    pub frame_timeout: Duration,
    /// Sliding deadline step while waiting for transport responses.
    pub response_timeout: Duration,
    /// Settling time granted to the slaves after a wakeup request.
    pub wakeup_delay: Duration,
    /// Verify every transmission against its loopback. Disable when the
    /// physical layer does not echo transmitted bytes into the receive
    /// path.
    pub readback_verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            baud: 19_200,
            frame_timeout: Duration::from_millis(50),
            response_timeout: Duration::from_millis(50),
            wakeup_delay: Duration::from_millis(100),
            readback_verify: true,
        }
    }
}

/// Writes and reads complete frames over an exclusively owned serial port.
///
/// A frame is break, sync and protected id (the head), followed for
/// non-empty frames by up to eight data bytes and a checksum (the
/// response). The break is produced by transmitting 0x00 at half the bus
/// speed: thirteen or more dominant bit times plus the recessive stop bit
/// as delimiter.
pub struct FrameTransfer<S, D = io::Sink> {
    port: S,
    debug: D,
    config: Config,
}

impl<S: SerialPort> FrameTransfer<S> {
    pub fn new(port: S, config: Config) -> Self {
        Self::with_debug(port, config, io::sink())
    }
}

impl<S: SerialPort, D: Write> FrameTransfer<S, D> {
    /// Create a frame transfer that copies diagnostic text to `debug`.
    /// The sink never participates in the protocol.
    pub fn with_debug(port: S, config: Config, debug: D) -> Self {
        FrameTransfer {
            port,
            debug,
            config,
        }
    }

    /// Open the underlying port at the configured speed.
    pub fn begin(&mut self) {
        let baud = self.config.baud;
        self.port.begin(baud);
    }

    /// Release the underlying port.
    pub fn end(&mut self) {
        self.port.end();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    pub(crate) fn debug_mut(&mut self) -> &mut D {
        &mut self.debug
    }

    /// Transmit a complete frame and verify it against the bus loopback.
    ///
    /// # Errors
    /// [`Error::ReadbackMismatch`](crate::Error) when the echoed frame does
    /// not decode back to the transmitted bytes (a bus-level bit error or a
    /// collision with another transmitter).
    pub fn write_frame(&mut self, fid: FrameId, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return self.write_empty_frame(fid);
        }

        let pid = fid.protected();
        self.write_frame_head(pid);
        self.port.write(data);
        self.port.write_byte(checksum::for_frame(pid, data));
        self.port.flush();

        if !self.config.readback_verify {
            return Ok(());
        }

        // The echo of our own transmission must decode as a valid frame and
        // match what was written.
        match self.receive_frame(pid, data.len()) {
            Ok(echo) if echo == data => Ok(()),
            _ => {
                let _ = writeln!(self.debug, "write_frame: readback failed");
                ReadbackMismatchSnafu.fail()
            }
        }
    }

    /// Transmit a frame head with no response: no data, no checksum.
    pub fn write_empty_frame(&mut self, fid: FrameId) -> Result<()> {
        let pid = fid.protected();
        self.write_frame_head(pid);
        self.port.flush();

        if !self.config.readback_verify {
            return Ok(());
        }

        self.receive_frame_head(pid)
    }

    /// Request `expected_len` data bytes from the node publishing `fid`.
    ///
    /// Transmits the frame head and waits for the frame response from the
    /// bus. The loopback of the head is consumed on the way.
    ///
    /// # Errors
    /// [`Error::ChecksumMismatch`](crate::Error) when a response arrived but
    /// failed its checksum, [`Error::TransportTimeout`](crate::Error) when
    /// no complete frame arrived inside the window.
    pub fn read_frame(&mut self, fid: FrameId, expected_len: usize) -> Result<Vec<u8>> {
        let pid = fid.protected();
        self.write_frame_head(pid);
        self.port.flush();
        self.receive_frame(pid, expected_len)
    }

    /// Wake the cluster: a break pulse, then time for the slaves to boot.
    pub fn request_wakeup(&mut self) {
        self.write_break();
        thread::sleep(self.config.wakeup_delay);
    }

    fn write_frame_head(&mut self, pid: ProtectedId) {
        self.write_break();
        self.port.write_byte(SYNC_FIELD);
        self.port.write_byte(*pid);
    }

    fn write_break(&mut self) {
        self.port.flush();
        // At half speed every bit time doubles, so the eight dominant bits
        // of 0x00 plus the start bit satisfy the >= 13 Tbit break, and the
        // stop bit forms the recessive delimiter.
        self.port.update_baud_rate(self.config.baud >> 1);
        self.port.write_byte(BREAK_FIELD);
        self.port.flush();
        self.port.update_baud_rate(self.config.baud);
    }

    fn receive_frame(&mut self, pid: ProtectedId, expected_len: usize) -> Result<Vec<u8>> {
        let mut reader = FrameReader::new(pid, expected_len);
        let deadline = Instant::now() + self.config.frame_timeout;
        while Instant::now() < deadline && !reader.is_complete() {
            match self.port.read() {
                Some(byte) => reader.process_byte(byte),
                None => continue,
            }
        }

        if !reader.is_complete() {
            let _ = writeln!(self.debug, "read: no valid frame inside the window");
            if reader.checksum_failed() {
                return ChecksumMismatchSnafu.fail();
            }
            return TransportTimeoutSnafu.fail();
        }
        Ok(reader.into_data())
    }

    fn receive_frame_head(&mut self, pid: ProtectedId) -> Result<()> {
        let mut reader = FrameReader::new(pid, 0);
        let deadline = Instant::now() + self.config.frame_timeout;
        while Instant::now() < deadline && !reader.has_head() {
            match self.port.read() {
                Some(byte) => reader.process_byte(byte),
                None => continue,
            }
        }

        if !reader.has_head() {
            let _ = writeln!(self.debug, "write_empty_frame: readback failed");
            return ReadbackMismatchSnafu.fail();
        }
        Ok(())
    }
}
