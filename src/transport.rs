//! Diagnostic transport layer: segmentation and reassembly of messages.
//!
//! A request is segmented into PDUs and transmitted as master-request
//! frames; the response is collected from slave-response frames and
//! reassembled. While waiting for the start of a response the layer is
//! lenient (frames from other nodes and garbage are ignored until the
//! deadline); once a segmented response has started, any irregularity
//! aborts the exchange.

use std::io::{self, Write};
use std::time::Instant;

use snafu::ensure;

use crate::frame::{Config, FrameTransfer};
use crate::pdu::{self, Pdu, CONSECUTIVE_FRAME_DATA, PDU_SIZE, SINGLE_FRAME_DATA};
use crate::types::{FrameId, NAD_BROADCAST};
use crate::uart::SerialPort;
use crate::{FrameFormatSnafu, MalformedSnafu, Result, TransportTimeoutSnafu};

pub struct TransportLayer<S, D = io::Sink> {
    frames: FrameTransfer<S, D>,
}

impl<S: SerialPort> TransportLayer<S> {
    pub fn new(port: S, config: Config) -> Self {
        TransportLayer {
            frames: FrameTransfer::new(port, config),
        }
    }
}

impl<S: SerialPort, D: Write> TransportLayer<S, D> {
    pub fn with_debug(port: S, config: Config, debug: D) -> Self {
        TransportLayer {
            frames: FrameTransfer::with_debug(port, config, debug),
        }
    }

    /// Access to the frame layer underneath.
    pub fn frames_mut(&mut self) -> &mut FrameTransfer<S, D> {
        &mut self.frames
    }

    /// Send `payload` to `nad` and return the reassembled response.
    ///
    /// With the broadcast address the first responding node is adopted and
    /// written back through `nad`.
    pub fn write_pdu(&mut self, nad: &mut u8, payload: &[u8]) -> Result<Vec<u8>> {
        self.write_pdu_expecting_new_nad(nad, payload, 0)
    }

    /// Like [`write_pdu`](Self::write_pdu), for the one service whose
    /// response arrives under a changed node address: a response from
    /// `new_nad` is accepted and written back through `nad`.
    pub fn write_pdu_expecting_new_nad(
        &mut self,
        nad: &mut u8,
        payload: &[u8],
        new_nad: u8,
    ) -> Result<Vec<u8>> {
        for frame in pdu::frameset_from_payload(*nad, payload) {
            self.frames
                .write_frame(FrameId::MASTER_REQUEST, &frame.to_bytes())?;
        }
        self.read_pdu_response(nad, new_nad)
    }

    fn read_pdu_response(&mut self, nad: &mut u8, new_nad: u8) -> Result<Vec<u8>> {
        let step = self.frames.config().response_timeout;
        let mut accepted_nad = *nad;
        let mut frame_counter: u32 = 0;
        let mut announced = 0;
        let mut payload = Vec::new();
        let mut complete = false;

        let mut deadline = Instant::now() + step;
        while !complete && Instant::now() < deadline {
            let raw = match self.frames.read_frame(FrameId::SLAVE_RESPONSE, PDU_SIZE) {
                Ok(raw) => raw,
                Err(_) => {
                    let _ = writeln!(self.frames.debug_mut(), "no response frame, retrying");
                    continue;
                }
            };
            let Ok(bytes) = <&[u8; PDU_SIZE]>::try_from(raw.as_slice()) else {
                continue;
            };
            let rx_nad = bytes[0];
            let frame = Pdu::from_bytes(bytes);

            if frame_counter == 0 {
                // The address is adopted from the frame under wildcard
                // addressing, or when the node answers under its announced
                // new address.
                if accepted_nad == NAD_BROADCAST || (new_nad != 0 && rx_nad == new_nad) {
                    accepted_nad = rx_nad;
                }
                if rx_nad != accepted_nad {
                    // Some other node: not our response.
                    continue;
                }

                match frame {
                    Some(Pdu::Single { data, .. }) => {
                        payload.extend_from_slice(&data);
                        complete = true;
                    }
                    Some(Pdu::First { len, data, .. }) => {
                        // A segmented message must exceed single frame
                        // capacity.
                        if usize::from(len) <= SINGLE_FRAME_DATA {
                            accepted_nad = *nad;
                            continue;
                        }
                        announced = usize::from(len);
                        payload.reserve(announced);
                        payload.extend_from_slice(&data);
                        frame_counter = 1;
                        deadline = Instant::now() + step;
                    }
                    // A consecutive frame without a first frame, or an
                    // unknown PCI type: not a response start.
                    _ => accepted_nad = *nad,
                }
            } else {
                // A consecutive frame sequence has started; from here on
                // every irregularity aborts.
                ensure!(rx_nad == accepted_nad, FrameFormatSnafu);
                let Some(Pdu::Consecutive { sn, data, .. }) = frame else {
                    return FrameFormatSnafu.fail();
                };
                ensure!(u32::from(sn) == frame_counter & 0x0F, FrameFormatSnafu);

                let take = (announced - payload.len()).min(CONSECUTIVE_FRAME_DATA);
                payload.extend_from_slice(&data[..take]);
                frame_counter += 1;
                deadline += step;
                if payload.len() == announced {
                    complete = true;
                }
            }
        }

        ensure!(complete, TransportTimeoutSnafu);
        ensure!(!payload.is_empty(), MalformedSnafu);

        // Report the address the response actually came from.
        if *nad == NAD_BROADCAST || new_nad != 0 {
            *nad = accepted_nad;
        }
        Ok(payload)
    }
}
