//! Transport layer protocol data units.
//!
//! A PDU is the fixed eight byte payload slot of a diagnostic frame:
//! the node address, one PCI byte encoding the frame type, and the data
//! bytes. Unused tail bytes of single and consecutive frames carry the fill
//! pattern 0xFF; a first frame is always full.

use arrayvec::ArrayVec;

/// On-wire size of every PDU.
pub const PDU_SIZE: usize = 8;
/// Payload capacity of a single frame.
pub const SINGLE_FRAME_DATA: usize = 6;
/// Payload bytes carried by a first frame (one byte is taken by the
/// announced length).
pub const FIRST_FRAME_DATA: usize = 5;
/// Payload capacity of a consecutive frame.
pub const CONSECUTIVE_FRAME_DATA: usize = 6;

const FILL_BYTE: u8 = 0xFF;

const PCI_TYPE_MASK: u8 = 0xF0;
const PCI_LEN_MASK: u8 = 0x0F;
const PCI_SN_MASK: u8 = 0x0F;

const PCI_SINGLE: u8 = 0x00;
const PCI_FIRST: u8 = 0x10;
const PCI_CONSECUTIVE: u8 = 0x20;

/// Variable-length payload slot of a single or consecutive frame.
pub type PduData = ArrayVec<u8, SINGLE_FRAME_DATA>;

/// One transport layer frame, decoded by PCI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    /// The whole message fits into one frame.
    Single { nad: u8, data: PduData },
    /// Announces a segmented message of `len` bytes and carries the first
    /// five of them.
    First {
        nad: u8,
        len: u16,
        data: [u8; FIRST_FRAME_DATA],
    },
    /// Continuation of a segmented message. `sn` is the sequence number
    /// modulo 16; the receiver knows how many of the six data bytes are
    /// payload.
    Consecutive {
        nad: u8,
        sn: u8,
        data: [u8; CONSECUTIVE_FRAME_DATA],
    },
}

impl Pdu {
    pub fn single(nad: u8, payload: &[u8]) -> Pdu {
        let mut data = PduData::new();
        data.try_extend_from_slice(payload)
            .expect("BUG: single frame payload exceeds six bytes");
        Pdu::Single { nad, data }
    }

    fn first(nad: u8, payload: &[u8]) -> Pdu {
        let mut data = [0; FIRST_FRAME_DATA];
        data.copy_from_slice(&payload[..FIRST_FRAME_DATA]);
        Pdu::First {
            nad,
            len: payload.len() as u16,
            data,
        }
    }

    fn consecutive(nad: u8, sn: u8, chunk: &[u8]) -> Pdu {
        let mut data = [FILL_BYTE; CONSECUTIVE_FRAME_DATA];
        data[..chunk.len()].copy_from_slice(chunk);
        Pdu::Consecutive {
            nad,
            sn: sn & PCI_SN_MASK,
            data,
        }
    }

    pub fn nad(&self) -> u8 {
        match *self {
            Pdu::Single { nad, .. } | Pdu::First { nad, .. } | Pdu::Consecutive { nad, .. } => nad,
        }
    }

    /// Encode into the on-wire layout.
    pub fn to_bytes(&self) -> [u8; PDU_SIZE] {
        let mut bytes = [FILL_BYTE; PDU_SIZE];
        match self {
            Pdu::Single { nad, data } => {
                bytes[0] = *nad;
                bytes[1] = PCI_SINGLE | data.len() as u8;
                bytes[2..2 + data.len()].copy_from_slice(data);
            }
            Pdu::First { nad, len, data } => {
                bytes[0] = *nad;
                bytes[1] = PCI_FIRST | (len >> 8) as u8;
                bytes[2] = (len & 0xFF) as u8;
                bytes[3..].copy_from_slice(data);
            }
            Pdu::Consecutive { nad, sn, data } => {
                bytes[0] = *nad;
                bytes[1] = PCI_CONSECUTIVE | (sn & PCI_SN_MASK);
                bytes[2..].copy_from_slice(data);
            }
        }
        bytes
    }

    /// Decode a received PDU. Returns `None` for an unknown PCI type or a
    /// single frame announcing more data than the slot holds.
    pub fn from_bytes(bytes: &[u8; PDU_SIZE]) -> Option<Pdu> {
        let nad = bytes[0];
        match bytes[1] & PCI_TYPE_MASK {
            PCI_SINGLE => {
                let len = usize::from(bytes[1] & PCI_LEN_MASK);
                if len > SINGLE_FRAME_DATA {
                    return None;
                }
                let mut data = PduData::new();
                data.try_extend_from_slice(&bytes[2..2 + len])
                    .expect("BUG: single frame slot exceeds capacity");
                Some(Pdu::Single { nad, data })
            }
            PCI_FIRST => {
                let len = u16::from(bytes[1] & PCI_LEN_MASK) << 8 | u16::from(bytes[2]);
                let mut data = [0; FIRST_FRAME_DATA];
                data.copy_from_slice(&bytes[3..]);
                Some(Pdu::First { nad, len, data })
            }
            PCI_CONSECUTIVE => {
                let sn = bytes[1] & PCI_SN_MASK;
                let mut data = [0; CONSECUTIVE_FRAME_DATA];
                data.copy_from_slice(&bytes[2..]);
                Some(Pdu::Consecutive { nad, sn, data })
            }
            _ => None,
        }
    }
}

/// Segment a message into the PDU sequence that transmits it.
///
/// Messages of up to six bytes travel in one single frame. Longer messages
/// produce a first frame followed by consecutive frames with sequence
/// numbers 1, 2, 3, ... wrapping at 16.
pub fn frameset_from_payload(nad: u8, payload: &[u8]) -> Vec<Pdu> {
    debug_assert!(payload.len() <= 0x0FFF, "announced length field is 12 bits");

    if payload.len() <= SINGLE_FRAME_DATA {
        return vec![Pdu::single(nad, payload)];
    }

    let tail = payload.len() - FIRST_FRAME_DATA;
    let cf_count = tail.div_ceil(CONSECUTIVE_FRAME_DATA);
    let mut frameset = Vec::with_capacity(1 + cf_count);

    frameset.push(Pdu::first(nad, payload));
    let mut offset = FIRST_FRAME_DATA;
    let mut sn: u8 = 1;
    while offset < payload.len() {
        let end = (offset + CONSECUTIVE_FRAME_DATA).min(payload.len());
        frameset.push(Pdu::consecutive(nad, sn, &payload[offset..end]));
        offset = end;
        sn = sn.wrapping_add(1);
    }
    frameset
}

/// The go-to-sleep command: a master request putting the whole cluster to
/// sleep.
pub fn sleep_command() -> [u8; PDU_SIZE] {
    let mut bytes = [FILL_BYTE; PDU_SIZE];
    bytes[0] = crate::types::NAD_SLEEP;
    bytes
}
