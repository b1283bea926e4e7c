mod common;

use common::*;
use ezwriter_proto::{track, CardData, Coercivity, Engine, EngineState, WritePolicy};

fn simulated_engine(policy: WritePolicy) -> Engine<SimulatedDevice> {
    init_logger();
    let config = test_config().with_write_policy(policy);
    let mut engine = Engine::with_config(SimulatedDevice::new(policy), config);
    engine.initialize().expect("Initialization failed");
    engine
}

#[test]
fn write_then_read_trimmed() {
    let mut engine = simulated_engine(WritePolicy::TrimSentinels);
    let card = CardData::from_tracks(
        "%B4111111111111111^DOE/JOHN^2512?",
        ";4111111111111111=2512?",
        "",
    )
    .unwrap();
    engine.write(Coercivity::High, &card).unwrap();
    assert_eq!(engine.read().unwrap(), card);
    assert_eq!(engine.state(), EngineState::Ready);
}

#[test]
fn write_then_read_raw() {
    let mut engine = simulated_engine(WritePolicy::Raw);
    let card = CardData::from_tracks("", ";123?", ";0987654321?").unwrap();
    engine.write(Coercivity::Low, &card).unwrap();
    assert_eq!(engine.read().unwrap(), card);
}

#[test]
fn read_back_after_trim_drops_foreign_sentinels() {
    // Data without sentinels loses its first and last byte on the way out
    let mut engine = simulated_engine(WritePolicy::TrimSentinels);
    let card = CardData::from_tracks("XHELLOX", "", "").unwrap();
    engine.write(Coercivity::High, &card).unwrap();
    let read = engine.read().unwrap();
    assert_eq!(*read.track(track(1)), "%HELLO?");
}

#[test]
fn erase_then_read() {
    let mut engine = simulated_engine(WritePolicy::TrimSentinels);
    let card = CardData::from_tracks("%A?", ";2?", ";3?").unwrap();
    engine.write(Coercivity::High, &card).unwrap();
    engine.erase_tracks(&[track(1), track(3)]).unwrap();

    let read = engine.read().unwrap();
    assert!(read.track(track(1)).is_empty());
    assert_eq!(*read.track(track(2)), ";2?");
    assert!(read.track(track(3)).is_empty());
}

#[test]
fn empty_card_round_trip() {
    for policy in [WritePolicy::TrimSentinels, WritePolicy::Raw].iter() {
        let mut engine = simulated_engine(*policy);
        engine.write(Coercivity::High, &CardData::new()).unwrap();
        let read = engine.read().unwrap();
        assert_eq!(read, CardData::new());
        assert_eq!(read.to_string(), "ISO Card Data:\n");
    }
}

#[test]
fn simulated_device_sees_initialization_order() {
    let mut engine = simulated_engine(WritePolicy::TrimSentinels);
    engine.version().unwrap();
    let device = engine.into_inner();
    let commands: Vec<&[u8]> = device.commands.iter().map(|c| c.as_slice()).collect();
    assert_eq!(
        commands,
        vec![
            &b"9"[..],
            &b"\x1ba"[..],
            &b"\x1be"[..],
            &b"\x1b\x87"[..],
            &b"\x1ba"[..],
            &b"\x1bu"[..],
        ]
    );
}
