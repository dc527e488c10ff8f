//! Serial port abstraction for the bus driver.
//!
//! The protocol layers hold the port by value and drive it through this
//! trait, so the same code runs against real UART hardware or a test
//! harness. The byte-level API is infallible; trouble on the wire surfaces
//! through timeouts and readback verification in the layers above.
//!
//! A single-wire bus echoes every transmitted byte into the receive path.
//! The protocol relies on that loopback to verify its own transmissions;
//! drivers without it must run with readback verification disabled (see
//! [`Config::readback_verify`](crate::Config)).

/// Contract between the protocol stack and the serial driver.
pub trait SerialPort {
    /// Queue one byte for transmission. Returns the number of bytes
    /// accepted.
    fn write_byte(&mut self, byte: u8) -> usize;

    /// Queue a buffer for transmission. Returns the number of bytes
    /// accepted.
    fn write(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().map(|&byte| self.write_byte(byte)).sum()
    }

    /// Non-blocking read of one received byte.
    fn read(&mut self) -> Option<u8>;

    /// Number of received bytes waiting to be read.
    fn available(&self) -> usize;

    /// Block until the transmit queue has drained onto the wire.
    fn flush(&mut self);

    /// Reconfigure the line speed. Must only be called after `flush`.
    fn update_baud_rate(&mut self, baud: u32);

    /// Open the port at the given speed. Drivers without an explicit
    /// lifecycle may ignore this.
    fn begin(&mut self, baud: u32) {
        let _ = baud;
    }

    /// Release the port.
    fn end(&mut self) {}
}
