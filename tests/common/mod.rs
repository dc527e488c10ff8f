#![allow(dead_code)]

//! Simulated serial interface with single-wire loopback semantics.
//!
//! Every byte the master writes is echoed into the receive path, exactly
//! like the physical bus does. Bytes a simulated slave would transmit are
//! queued with `push_rx` and become readable once the loopback has
//! drained, matching the order on the wire.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use lin_master::SerialPort;

pub struct SerialSim {
    /// Echo every transmitted byte into the receive path.
    pub loopback: bool,
    loopback_queue: VecDeque<u8>,
    rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub baud: u32,
    pub baud_log: Vec<u32>,
}

impl SerialSim {
    pub fn new() -> Rc<RefCell<SerialSim>> {
        Rc::new(RefCell::new(SerialSim {
            loopback: true,
            loopback_queue: VecDeque::new(),
            rx: VecDeque::new(),
            tx: Vec::new(),
            baud: 19_200,
            baud_log: Vec::new(),
        }))
    }

    /// Enqueue bytes as if a slave had transmitted them.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }
}

pub struct SerialIOPlane(Rc<RefCell<SerialSim>>);

impl SerialIOPlane {
    pub fn new(sim: &Rc<RefCell<SerialSim>>) -> SerialIOPlane {
        SerialIOPlane(sim.clone())
    }
}

impl SerialPort for SerialIOPlane {
    fn write_byte(&mut self, byte: u8) -> usize {
        let mut sim = self.0.borrow_mut();
        sim.tx.push(byte);
        if sim.loopback {
            sim.loopback_queue.push_back(byte);
        }
        1
    }

    fn read(&mut self) -> Option<u8> {
        let mut sim = self.0.borrow_mut();
        let byte = sim.loopback_queue.pop_front();
        byte.or_else(|| sim.rx.pop_front())
    }

    fn available(&self) -> usize {
        let sim = self.0.borrow();
        sim.loopback_queue.len() + sim.rx.len()
    }

    fn flush(&mut self) {}

    fn update_baud_rate(&mut self, baud: u32) {
        let mut sim = self.0.borrow_mut();
        sim.baud = baud;
        sim.baud_log.push(baud);
    }

    fn begin(&mut self, baud: u32) {
        self.0.borrow_mut().baud = baud;
    }
}
