//! Checksum calculation for LIN frames.
//!
//! Both checksum models are an inverted eight bit sum with end-around
//! carry. The enhanced model seeds the sum with the protected id and covers
//! frame ids 0x00-0x3B; the classic model starts at zero and covers the
//! diagnostic ids 0x3C/0x3D. The reserved ids 0x3E/0x3F take the classic
//! branch as well.

use crate::types::{FrameId, ProtectedId};

/// Checksum covering the protected id and the data bytes (LIN 2.x frames).
pub fn enhanced(pid: ProtectedId, data: &[u8]) -> u8 {
    folded_sum(*pid, data)
}

/// Checksum covering the data bytes only (diagnostic and LIN 1.x frames).
pub fn classic(data: &[u8]) -> u8 {
    folded_sum(0x00, data)
}

/// Select the checksum model from the frame id and compute the checksum.
pub fn for_frame(pid: ProtectedId, data: &[u8]) -> u8 {
    if pid.frame_id() >= *FrameId::MASTER_REQUEST {
        classic(data)
    } else {
        enhanced(pid, data)
    }
}

/// Check a received frame body against its checksum byte.
pub fn validate(pid: ProtectedId, data: &[u8], checksum: u8) -> bool {
    for_frame(pid, data) == checksum
}

fn folded_sum(seed: u8, data: &[u8]) -> u8 {
    let mut sum = u32::from(seed);
    for &byte in data {
        sum += u32::from(byte);
    }
    // Fold the carry bits back into the low byte.
    sum = (sum & 0xFF) + (sum >> 8);
    sum += sum >> 8;
    !(sum as u8)
}
