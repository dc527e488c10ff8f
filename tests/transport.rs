mod common;
use common::{SerialIOPlane, SerialSim};

use std::cell::RefCell;
use std::rc::Rc;

use lin_master::{Config, TransportLayer, NAD_BROADCAST};

fn transport(sim: &Rc<RefCell<SerialSim>>) -> TransportLayer<SerialIOPlane> {
    TransportLayer::new(SerialIOPlane::new(sim), Config::default())
}

#[test]
fn single_frame_request_single_frame_response() {
    let sim = SerialSim::new();
    let mut dtl = transport(&sim);

    // Slave answers with a full single frame.
    sim.borrow_mut()
        .push_rx(&[0x0A, 0x06, 0x62, 0x06, 0x2E, 0x80, 0x00, 0x00, 0xD8]);

    let mut nad = 0x0A;
    let response = dtl.write_pdu(&mut nad, &[0x22, 0x06, 0x2E]).unwrap();

    assert_eq!(response, [0x62, 0x06, 0x2E, 0x80, 0x00, 0x00]);
    assert_eq!(nad, 0x0A);

    assert_eq!(
        sim.borrow().tx,
        [
            // Master request: single frame, three payload bytes, fill.
            0x00, 0x55, 0x3C, //
            0x0A, 0x03, 0x22, 0x06, 0x2E, 0xFF, 0xFF, 0xFF, 0x9C,
            // Slave response head; the body comes from the slave.
            0x00, 0x55, 0x7D,
        ]
    );
}

#[test]
fn full_single_frame_request_has_no_fill() {
    let sim = SerialSim::new();
    let mut dtl = transport(&sim);

    sim.borrow_mut()
        .push_rx(&[0x0A, 0x05, 0x62, 0x06, 0x2E, 0x80, 0x00, 0xFF, 0xD9]);

    let mut nad = 0x0A;
    let response = dtl
        .write_pdu(&mut nad, &[0x22, 0x06, 0x2E, 0x87, 0x47, 0x41])
        .unwrap();

    assert_eq!(response, [0x62, 0x06, 0x2E, 0x80, 0x00]);
    assert_eq!(nad, 0x0A);

    assert_eq!(
        sim.borrow().tx,
        [
            0x00, 0x55, 0x3C, //
            0x0A, 0x06, 0x22, 0x06, 0x2E, 0x87, 0x47, 0x41, 0x89, //
            0x00, 0x55, 0x7D,
        ]
    );
}

#[test]
fn multi_frame_response_is_reassembled() {
    let sim = SerialSim::new();
    let mut dtl = transport(&sim);

    // First frame announcing 20 bytes, then three consecutive frames; the
    // last one is padded.
    sim.borrow_mut().push_rx(&[
        0x0A, 0x10, 0x14, 0x62, 0x06, 0x5E, 0x96, 0x54, 0x20, //
        0x0A, 0x21, 0x62, 0x06, 0x5E, 0x44, 0x55, 0x78, 0xFB, //
        0x0A, 0x22, 0x54, 0x10, 0x01, 0x00, 0xFF, 0xEE, 0x7F, //
        0x0A, 0x23, 0x12, 0x99, 0x21, 0xFF, 0xFF, 0xFF, 0x06,
    ]);

    let mut nad = NAD_BROADCAST;
    let response = dtl.write_pdu(&mut nad, &[0x22, 0x06, 0x5E]).unwrap();

    assert_eq!(
        response,
        [
            0x62, 0x06, 0x5E, 0x96, 0x54, //
            0x62, 0x06, 0x5E, 0x44, 0x55, 0x78, //
            0x54, 0x10, 0x01, 0x00, 0xFF, 0xEE, //
            0x12, 0x99, 0x21,
        ]
    );
    // The wildcard resolved to the responding node.
    assert_eq!(nad, 0x0A);

    assert_eq!(
        sim.borrow().tx,
        [
            0x00, 0x55, 0x3C, //
            0x7F, 0x03, 0x22, 0x06, 0x5E, 0xFF, 0xFF, 0xFF, 0xF6, //
            // One slave response head per received frame.
            0x00, 0x55, 0x7D, //
            0x00, 0x55, 0x7D, //
            0x00, 0x55, 0x7D, //
            0x00, 0x55, 0x7D,
        ]
    );
}

#[test]
fn multi_frame_request_is_segmented() {
    let sim = SerialSim::new();
    let mut dtl = transport(&sim);

    sim.borrow_mut()
        .push_rx(&[0x0A, 0x01, 0xA2, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x52]);

    let payload = [
        0x62, 0x06, 0x5E, 0x33, 0x43, //
        0x38, 0x39, 0x35, 0x39, 0x35, 0x33, //
        0x37, 0x20, 0x20,
    ];
    let mut nad = NAD_BROADCAST;
    let response = dtl.write_pdu(&mut nad, &payload).unwrap();

    assert_eq!(response, [0xA2]);
    assert_eq!(nad, 0x0A);

    assert_eq!(
        sim.borrow().tx,
        [
            // First frame announcing fourteen bytes.
            0x00, 0x55, 0x3C, //
            0x7F, 0x10, 0x0E, 0x62, 0x06, 0x5E, 0x33, 0x43, 0x25, //
            // Consecutive frame 1, full.
            0x00, 0x55, 0x3C, //
            0x7F, 0x21, 0x38, 0x39, 0x35, 0x39, 0x35, 0x33, 0x17, //
            // Consecutive frame 2, three payload bytes plus fill.
            0x00, 0x55, 0x3C, //
            0x7F, 0x22, 0x37, 0x20, 0x20, 0xFF, 0xFF, 0xFF, 0xE6, //
            // Slave response head.
            0x00, 0x55, 0x7D,
        ]
    );
}

#[test]
fn multi_frame_exchange_without_fill() {
    let sim = SerialSim::new();
    let mut dtl = transport(&sim);

    sim.borrow_mut().push_rx(&[
        0x0A, 0x10, 0x11, 0xD9, 0xA2, 0xA3, 0xA4, 0xA5, 0x6A, //
        0x0A, 0x21, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0x9B, //
        0x0A, 0x22, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0x3A,
    ]);

    let payload = [
        0x99, 0x98, 0x97, 0x96, 0x95, //
        0x89, 0x88, 0x87, 0x86, 0x85, 0x84, //
        0x79, 0x78, 0x77, 0x76, 0x75, 0x74,
    ];
    let mut nad = NAD_BROADCAST;
    let response = dtl.write_pdu(&mut nad, &payload).unwrap();

    assert_eq!(
        response,
        [
            0xD9, 0xA2, 0xA3, 0xA4, 0xA5, //
            0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, //
            0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        ]
    );
    assert_eq!(nad, 0x0A);

    assert_eq!(
        sim.borrow().tx,
        [
            0x00, 0x55, 0x3C, //
            0x7F, 0x10, 0x11, 0x99, 0x98, 0x97, 0x96, 0x95, 0x69, //
            0x00, 0x55, 0x3C, //
            0x7F, 0x21, 0x89, 0x88, 0x87, 0x86, 0x85, 0x84, 0x35, //
            0x00, 0x55, 0x3C, //
            0x7F, 0x22, 0x79, 0x78, 0x77, 0x76, 0x75, 0x74, 0x94, //
            0x00, 0x55, 0x7D, //
            0x00, 0x55, 0x7D, //
            0x00, 0x55, 0x7D,
        ]
    );
}
