//! Bus master implementation of the LIN 2.2A protocol over a serial link.
//!
//! The stack is layered the way LIN 2.2A slices the protocol:
//!
//! * [`FrameTransfer`] writes and reads raw frames (break, sync, protected
//!   id, data, checksum) and verifies its own transmissions against the
//!   single-wire loopback.
//! * [`TransportLayer`] segments diagnostic messages into single, first and
//!   consecutive frames addressed by node address, and reassembles the
//!   responses.
//! * [`NodeConfig`] implements the node configuration services (read by
//!   identifier, assign NAD, conditional change NAD, save configuration,
//!   assign frame id range) on top of the transport layer.
//!
//! All layers drive the serial port through the [`SerialPort`] trait and
//! block on it; the stack owns the port exclusively.
//!
//! # Example
//!
//! ```
//! use lin_master::{Config, FrameId, FrameTransfer, SerialPort};
//! # use std::collections::VecDeque;
//! # struct EchoPort { rx: VecDeque<u8>, baud: u32 }
//! # impl SerialPort for EchoPort {
//! #     fn write_byte(&mut self, byte: u8) -> usize { self.rx.push_back(byte); 1 }
//! #     fn read(&mut self) -> Option<u8> { self.rx.pop_front() }
//! #     fn available(&self) -> usize { self.rx.len() }
//! #     fn flush(&mut self) {}
//! #     fn update_baud_rate(&mut self, baud: u32) { self.baud = baud; }
//! # }
//! # fn main() -> lin_master::Result<()> {
//! # let port = EchoPort { rx: VecDeque::new(), baud: 19_200 };
//! let mut lin = FrameTransfer::new(port, Config::default());
//! lin.write_frame(FrameId::new(0x10)?, &[0x01, 0x02])?;
//! # Ok(())
//! # }
//! ```

use snafu::Snafu;

pub mod checksum;
pub mod frame;
pub mod node_config;
pub mod pdu;
mod reader;
pub mod transport;
pub mod types;
pub mod uart;

pub use frame::{Config, FrameTransfer};
pub use node_config::{NodeConfig, Nrc, ProductId};
pub use pdu::Pdu;
pub use transport::TransportLayer;
pub use types::{
    FrameId, ProtectedId, FUNCTION_ID_WILDCARD, NAD_BROADCAST, NAD_FUNCTIONAL, NAD_SLEEP,
    SUPPLIER_ID_WILDCARD,
};
pub use uart::SerialPort;

/// Error type for this crate.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The value is not a valid six bit frame id.
    #[snafu(display("Invalid frame id"))]
    InvalidFrameId,
    /// No complete frame arrived inside the timeout window.
    #[snafu(display("No valid frame received before the timeout"))]
    TransportTimeout,
    /// A received frame failed checksum validation.
    #[snafu(display("Frame checksum mismatch"))]
    ChecksumMismatch,
    /// A response frame broke the reassembly rules: wrong PCI type,
    /// sequence number or node address mid-message.
    #[snafu(display("Unexpected frame during response reassembly"))]
    FrameFormat,
    /// The loopback of a transmission did not decode back to the
    /// transmitted bytes.
    #[snafu(display("Transmitted frame did not read back from the bus"))]
    ReadbackMismatch,
    /// The slave rejected the service request.
    #[snafu(display("Negative response for service 0x{sid:02X}: {nrc}"))]
    NegativeResponse { sid: u8, nrc: Nrc },
    /// The response payload had an unexpected shape.
    #[snafu(display("Malformed response payload"))]
    Malformed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
