//! Byte-level decoder for a single incoming LIN frame.

use crate::checksum;
use crate::types::{ProtectedId, BREAK_FIELD, SYNC_FIELD};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    WaitForBreak,
    WaitForSync,
    WaitForPid,
    WaitForData,
    WaitForChecksum,
    Complete,
}

/// Decodes one frame with a known protected id and data length from the
/// receive byte stream.
///
/// Garbage before the break and any partially seen earlier frame are
/// skipped: a sync or pid mismatch drops the collected bytes and waits for
/// the next break, so the reader resynchronizes on its own.
#[derive(Debug)]
pub(crate) struct FrameReader {
    state: State,
    pid: ProtectedId,
    expected_len: usize,
    data: Vec<u8>,
    checksum_failed: bool,
}

impl FrameReader {
    pub fn new(pid: ProtectedId, expected_len: usize) -> Self {
        FrameReader {
            state: State::WaitForBreak,
            pid,
            expected_len,
            data: Vec::with_capacity(expected_len),
            checksum_failed: false,
        }
    }

    pub fn process_byte(&mut self, byte: u8) {
        match self.state {
            State::WaitForBreak => {
                if byte == BREAK_FIELD {
                    self.state = State::WaitForSync;
                }
            }

            State::WaitForSync => {
                if byte == SYNC_FIELD {
                    self.state = State::WaitForPid;
                } else {
                    self.reset();
                }
            }

            State::WaitForPid => {
                if byte == *self.pid {
                    self.state = State::WaitForData;
                } else {
                    self.reset();
                }
            }

            State::WaitForData => {
                self.data.push(byte);
                if self.data.len() >= self.expected_len {
                    self.state = State::WaitForChecksum;
                }
            }

            State::WaitForChecksum => {
                if checksum::validate(self.pid, &self.data, byte) {
                    self.state = State::Complete;
                } else {
                    self.checksum_failed = true;
                    self.reset();
                }
            }

            State::Complete => {}
        }
    }

    /// Break, sync and pid have been seen; the frame response may follow.
    pub fn has_head(&self) -> bool {
        self.state >= State::WaitForData
    }

    /// A full frame with a valid checksum has been received.
    pub fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    /// A checksum comparison failed at some point, even if the reader has
    /// resynchronized since. Survives `reset`.
    pub fn checksum_failed(&self) -> bool {
        self.checksum_failed
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn reset(&mut self) {
        self.state = State::WaitForBreak;
        self.data.clear();
    }
}
