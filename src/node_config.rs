//! Node configuration and identification services.
//!
//! Every service transmits a request `[SID, args...]` through the transport
//! layer and classifies the response: positive when it starts with
//! `SID | 0x40`, negative when it is `0x7F, SID, NRC`.

use std::io::{self, Write};

use snafu::ensure;

use crate::frame::{Config, FrameTransfer};
use crate::pdu;
use crate::transport::TransportLayer;
use crate::types::FrameId;
use crate::uart::SerialPort;
use crate::{MalformedSnafu, NegativeResponseSnafu, Result};

/// Marker for a negative response payload.
const NEGATIVE_RESPONSE: u8 = 0x7F;

/// Converting a service identifier into its response counterpart.
const RSID_OFFSET: u8 = 0x40;

/// Node configuration service identifiers (0xB0-0xB7).
///
/// Data dump (0xB4) and the obsolete assign-frame-id (0xB1) are not
/// provided.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
enum Sid {
    AssignNad = 0xB0,
    ReadById = 0xB2,
    ConditionalChangeNad = 0xB3,
    SaveConfig = 0xB6,
    AssignFrameIdRange = 0xB7,
}

impl Sid {
    const fn rsid(self) -> u8 {
        self as u8 | RSID_OFFSET
    }
}

/// Read-by-identifier selectors.
const ID_PRODUCT_ID: u8 = 0x00;
const ID_SERIAL_NUMBER: u8 = 0x01;

/// Negative response codes a slave may raise against a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Nrc {
    GeneralReject,
    ServiceNotSupported,
    SubfunctionNotSupported,
    IncorrectMessageLengthOrInvalidFormat,
    ResponseTooLong,
    BusyRepeatRequest,
    ConditionsNotCorrect,
    RequestOutOfRange,
    SecurityAccessDenied,
    InvalidKey,
    /// A code outside the standard taxonomy.
    Other(u8),
}

impl Nrc {
    pub fn from_raw(raw: u8) -> Nrc {
        match raw {
            0x10 => Nrc::GeneralReject,
            0x11 => Nrc::ServiceNotSupported,
            0x12 => Nrc::SubfunctionNotSupported,
            0x13 => Nrc::IncorrectMessageLengthOrInvalidFormat,
            0x14 => Nrc::ResponseTooLong,
            0x21 => Nrc::BusyRepeatRequest,
            0x22 => Nrc::ConditionsNotCorrect,
            0x31 => Nrc::RequestOutOfRange,
            0x33 => Nrc::SecurityAccessDenied,
            0x35 => Nrc::InvalidKey,
            other => Nrc::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Nrc::GeneralReject => 0x10,
            Nrc::ServiceNotSupported => 0x11,
            Nrc::SubfunctionNotSupported => 0x12,
            Nrc::IncorrectMessageLengthOrInvalidFormat => 0x13,
            Nrc::ResponseTooLong => 0x14,
            Nrc::BusyRepeatRequest => 0x21,
            Nrc::ConditionsNotCorrect => 0x22,
            Nrc::RequestOutOfRange => 0x31,
            Nrc::SecurityAccessDenied => 0x33,
            Nrc::InvalidKey => 0x35,
            Nrc::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Nrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Nrc::GeneralReject => f.write_str("general reject"),
            Nrc::ServiceNotSupported => f.write_str("service not supported"),
            Nrc::SubfunctionNotSupported => f.write_str("subfunction not supported"),
            Nrc::IncorrectMessageLengthOrInvalidFormat => {
                f.write_str("incorrect message length or invalid format")
            }
            Nrc::ResponseTooLong => f.write_str("response too long"),
            Nrc::BusyRepeatRequest => f.write_str("busy, repeat request"),
            Nrc::ConditionsNotCorrect => f.write_str("conditions not correct"),
            Nrc::RequestOutOfRange => f.write_str("request out of range"),
            Nrc::SecurityAccessDenied => f.write_str("security access denied"),
            Nrc::InvalidKey => f.write_str("invalid key"),
            Nrc::Other(raw) => write!(f, "unknown code 0x{raw:02X}"),
        }
    }
}

/// Product identification of a node (LIN 2.2A 4.2.1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductId {
    pub supplier_id: u16,
    pub function_id: u16,
    pub variant: u8,
}

/// Master-side node configuration: identification, addressing and frame id
/// assignment of the slaves on the bus.
///
/// Services addressing a node take `nad: &mut u8` because a wildcard
/// request resolves to the responder's address, which is written back for
/// the caller.
pub struct NodeConfig<S, D = io::Sink> {
    transport: TransportLayer<S, D>,
}

impl<S: SerialPort> NodeConfig<S> {
    pub fn new(port: S, config: Config) -> Self {
        NodeConfig {
            transport: TransportLayer::new(port, config),
        }
    }
}

impl<S: SerialPort, D: Write> NodeConfig<S, D> {
    pub fn with_debug(port: S, config: Config, debug: D) -> Self {
        NodeConfig {
            transport: TransportLayer::with_debug(port, config, debug),
        }
    }

    /// Access to the transport layer underneath.
    pub fn transport_mut(&mut self) -> &mut TransportLayer<S, D> {
        &mut self.transport
    }

    /// Open the underlying port at the configured speed.
    pub fn begin(&mut self) {
        self.frames().begin();
    }

    /// Release the underlying port.
    pub fn end(&mut self) {
        self.frames().end();
    }

    /// Wake the sleeping cluster with a dominant pulse, then give the
    /// slaves time to initialize.
    pub fn request_wakeup(&mut self) {
        self.frames().request_wakeup();
    }

    /// Request all nodes to go to sleep.
    pub fn request_go_to_sleep(&mut self) -> Result<()> {
        let sleep = pdu::sleep_command();
        self.frames().write_frame(FrameId::MASTER_REQUEST, &sleep)
    }

    /// Read five data bytes selected by `id` from a node (LIN 2.2A 4.2.6).
    pub fn read_by_id(
        &mut self,
        nad: &mut u8,
        supplier_id: u16,
        function_id: u16,
        id: u8,
    ) -> Result<[u8; 5]> {
        let [sup_lo, sup_hi] = supplier_id.to_le_bytes();
        let [fn_lo, fn_hi] = function_id.to_le_bytes();
        let request = [Sid::ReadById as u8, id, sup_lo, sup_hi, fn_lo, fn_hi];

        let response = self.transport.write_pdu(nad, &request)?;
        self.check_payload(Sid::ReadById, &response)?;
        ensure!(response.len() >= 6, MalformedSnafu);
        Ok([
            response[1],
            response[2],
            response[3],
            response[4],
            response[5],
        ])
    }

    /// Read supplier id, function id and variant from a node. Mandatory for
    /// every node; all of `nad`, `supplier_id` and `function_id` may be
    /// wildcards.
    pub fn read_product_id(
        &mut self,
        nad: &mut u8,
        supplier_id: u16,
        function_id: u16,
    ) -> Result<ProductId> {
        let raw = self.read_by_id(nad, supplier_id, function_id, ID_PRODUCT_ID)?;
        Ok(ProductId {
            supplier_id: u16::from_le_bytes([raw[0], raw[1]]),
            function_id: u16::from_le_bytes([raw[2], raw[3]]),
            variant: raw[4],
        })
    }

    /// Read the serial number of a node. Optional for nodes.
    pub fn read_serial_number(
        &mut self,
        nad: &mut u8,
        supplier_id: u16,
        function_id: u16,
    ) -> Result<u32> {
        let [sup_lo, sup_hi] = supplier_id.to_le_bytes();
        let [fn_lo, fn_hi] = function_id.to_le_bytes();
        let request = [
            Sid::ReadById as u8,
            ID_SERIAL_NUMBER,
            sup_lo,
            sup_hi,
            fn_lo,
            fn_hi,
        ];

        let response = self.transport.write_pdu(nad, &request)?;
        self.check_payload(Sid::ReadById, &response)?;
        ensure!(response.len() >= 5, MalformedSnafu);
        Ok(u32::from_le_bytes([
            response[1],
            response[2],
            response[3],
            response[4],
        ]))
    }

    /// Unconditionally assign a new node address (LIN 2.2A 4.2.5.1). The
    /// response still arrives under the initial address.
    pub fn assign_nad(
        &mut self,
        nad: &mut u8,
        supplier_id: u16,
        function_id: u16,
        new_nad: u8,
    ) -> Result<()> {
        let [sup_lo, sup_hi] = supplier_id.to_le_bytes();
        let [fn_lo, fn_hi] = function_id.to_le_bytes();
        let request = [Sid::AssignNad as u8, sup_lo, sup_hi, fn_lo, fn_hi, new_nad];

        let response = self.transport.write_pdu(nad, &request)?;
        self.check_payload(Sid::AssignNad, &response)
    }

    /// Change the node address of the node whose identification data
    /// matches the select-and-mask test (LIN 2.2A 4.2.5.2): take the byte
    /// selected by `id`/`byte`, XOR with `invert`, AND with `mask`; a zero
    /// result changes the address. A positive response arrives under the
    /// new address.
    pub fn conditional_change_nad(
        &mut self,
        nad: &mut u8,
        id: u8,
        byte: u8,
        invert: u8,
        mask: u8,
        new_nad: u8,
    ) -> Result<()> {
        let request = [
            Sid::ConditionalChangeNad as u8,
            id,
            byte,
            mask,
            invert,
            new_nad,
        ];

        let response = self
            .transport
            .write_pdu_expecting_new_nad(nad, &request, new_nad)?;
        self.check_payload(Sid::ConditionalChangeNad, &response)
    }

    /// Request a node to persist its current configuration
    /// (LIN 2.2A 4.2.5.4).
    pub fn save_config(&mut self, nad: &mut u8) -> Result<()> {
        let request = [Sid::SaveConfig as u8];
        let response = self.transport.write_pdu(nad, &request)?;
        self.check_payload(Sid::SaveConfig, &response)
    }

    /// Assign protected ids to four consecutive frame slots starting at
    /// `start_index` (LIN 2.2A 4.2.5.5). 0x00 keeps a slot unassigned,
    /// 0xFF leaves it untouched.
    pub fn assign_frame_id_range(
        &mut self,
        nad: &mut u8,
        start_index: u8,
        pids: [u8; 4],
    ) -> Result<()> {
        let request = [
            Sid::AssignFrameIdRange as u8,
            start_index,
            pids[0],
            pids[1],
            pids[2],
            pids[3],
        ];

        let response = self.transport.write_pdu(nad, &request)?;
        self.check_payload(Sid::AssignFrameIdRange, &response)
    }

    fn frames(&mut self) -> &mut FrameTransfer<S, D> {
        self.transport.frames_mut()
    }

    /// Classify a response payload for `sid`: positive, negative or
    /// malformed.
    fn check_payload(&mut self, sid: Sid, response: &[u8]) -> Result<()> {
        if response.first() == Some(&sid.rsid()) {
            return Ok(());
        }

        if response.len() >= 3 && response[0] == NEGATIVE_RESPONSE {
            let nrc = Nrc::from_raw(response[2]);
            let _ = writeln!(
                self.frames().debug_mut(),
                "service 0x{:02X} rejected: {}",
                response[1],
                nrc
            );
            return NegativeResponseSnafu {
                sid: response[1],
                nrc,
            }
            .fail();
        }

        MalformedSnafu.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nrc_round_trip() {
        for raw in [0x10, 0x11, 0x12, 0x13, 0x14, 0x21, 0x22, 0x31, 0x33, 0x35] {
            let nrc = Nrc::from_raw(raw);
            assert!(!matches!(nrc, Nrc::Other(_)), "0x{raw:02X} is standard");
            assert_eq!(nrc.raw(), raw);
        }
        assert_eq!(Nrc::from_raw(0x77), Nrc::Other(0x77));
        assert_eq!(Nrc::Other(0x77).raw(), 0x77);
    }

    #[test]
    fn test_rsid() {
        assert_eq!(Sid::ReadById.rsid(), 0xF2);
        assert_eq!(Sid::AssignNad.rsid(), 0xF0);
        assert_eq!(Sid::AssignFrameIdRange.rsid(), 0xF7);
    }
}
