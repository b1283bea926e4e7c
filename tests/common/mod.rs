#![allow(dead_code)]

use std::cell::RefCell;
use std::cmp::min;
use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::rc::Rc;
use std::time::Duration;

use ezwriter_proto::{CardData, Config, Engine, Track, TrackNumber, WritePolicy};

pub const ESC: u8 = 0x1b;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Engine configuration without the post-reset delay.
pub fn test_config() -> Config {
    Config::default().with_settle_delay(Duration::ZERO)
}

/// Serial interface replaying canned device output, and capturing everything sent to it.
pub struct SerialInterface {
    rx: Vec<u8>,
    rx_pos: usize,
    pub tx: Vec<u8>,
    do_read_error: bool,
    do_write_error: bool,
    writes_before_error: Option<usize>,
}

pub struct SerialIOPlane(Rc<RefCell<SerialInterface>>);

impl SerialIOPlane {
    pub fn new(serial_if: &Rc<RefCell<SerialInterface>>) -> SerialIOPlane {
        SerialIOPlane(serial_if.clone())
    }
}

impl SerialInterface {
    pub fn new(rx: &[u8]) -> Rc<RefCell<SerialInterface>> {
        Rc::new(RefCell::new(SerialInterface {
            rx: rx.to_vec(),
            tx: Vec::new(),
            rx_pos: 0,
            do_read_error: false,
            do_write_error: false,
            writes_before_error: None,
        }))
    }

    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    /// Fail the write following the next `writes` successful ones.
    pub fn trigger_write_error_after(&mut self, writes: usize) {
        self.writes_before_error = Some(writes);
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }
}

impl std::io::Read for SerialIOPlane {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.do_read_error {
            inner.do_read_error = false;
            Err(Error::new(ErrorKind::TimedOut, "IO read error"))
        } else {
            let old_pos = inner.rx_pos;
            inner.rx_pos = min(old_pos + buf.len(), inner.rx.len());
            let len = inner.rx_pos - old_pos;
            buf[..len].copy_from_slice(&inner.rx[old_pos..inner.rx_pos]);
            Ok(len)
        }
    }
}

impl std::io::Write for SerialIOPlane {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        match inner.writes_before_error {
            Some(0) => {
                inner.writes_before_error = None;
                inner.do_write_error = true;
            }
            Some(n) => inner.writes_before_error = Some(n - 1),
            None => {}
        }
        if inner.do_write_error {
            inner.do_write_error = false;
            Err(Error::new(ErrorKind::BrokenPipe, "IO write error"))
        } else {
            inner.tx.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Engine connected to a scripted serial interface.
pub fn scripted_engine(rx: &[u8]) -> (Rc<RefCell<SerialInterface>>, Engine<SerialIOPlane>) {
    init_logger();
    let serial_sim = SerialInterface::new(rx);
    let engine = Engine::with_config(SerialIOPlane::new(&serial_sim), test_config());
    (serial_sim, engine)
}

/// Device replies to a successful initialization.
pub const INIT_RX: &[u8] = b"\x1b4\x1by\x1b0";

/// Engine connected to a scripted interface, already initialized.
pub fn ready_engine(rx: &[u8]) -> (Rc<RefCell<SerialInterface>>, Engine<SerialIOPlane>) {
    let (serial_sim, mut engine) = scripted_engine(INIT_RX);
    engine.initialize().expect("Initialization failed");
    serial_sim.borrow_mut().take_tx();
    serial_sim.borrow_mut().push_rx(rx);
    (serial_sim, engine)
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Mode {
    Command,
    EraseMask,
    WriteStream,
}

/// A simulated card reader/writer with a single card permanently swiped.
///
/// Tracks are written with the shifted track encoding. When `raw` is false the
/// device adds start and end sentinels to written data, like the hardware does
/// with data sent under the trimming write policy.
pub struct SimulatedDevice {
    pub card: CardData,
    pub raw: bool,
    pub commands: Vec<Vec<u8>>,
    mode: Mode,
    input: Vec<u8>,
    output: VecDeque<u8>,
}

impl SimulatedDevice {
    pub fn new(write_policy: WritePolicy) -> Self {
        Self {
            card: CardData::new(),
            raw: write_policy == WritePolicy::Raw,
            commands: Vec::new(),
            mode: Mode::Command,
            input: Vec::new(),
            output: VecDeque::new(),
        }
    }

    fn reply(&mut self, data: &[u8]) {
        self.output.extend(data.iter().copied());
    }

    fn process(&mut self) {
        match self.mode {
            Mode::Command => self.command(),
            Mode::EraseMask => {
                let mask = self.input[0];
                self.input.clear();
                for number in TrackNumber::ALL.iter() {
                    if mask & (1 << **number) != 0 {
                        self.card.set_track(*number, Track::empty());
                    }
                }
                self.mode = Mode::Command;
                self.reply(b"\x1b0");
            }
            Mode::WriteStream => {
                if self.input.ends_with(b"?\x1c") {
                    let stream = std::mem::take(&mut self.input);
                    self.store(&stream[..stream.len() - 2]);
                    self.mode = Mode::Command;
                    self.reply(b"\x1b0");
                }
            }
        }
    }

    fn command(&mut self) {
        match (self.input.first().copied(), self.input.len()) {
            (Some(b'9'), 1) | (Some(ESC), 2) => {}
            (Some(ESC), 1) => return,
            _ => {
                // Unknown input is dropped
                self.input.clear();
                return;
            }
        }
        let cmd = std::mem::take(&mut self.input);
        self.commands.push(cmd.clone());
        match cmd.as_slice() {
            b"9" => self.reply(b"\x1b4"),
            b"\x1ba" => self.output.clear(),
            b"\x1be" => self.reply(b"\x1by"),
            b"\x1b\x87" | b"\x1bx" | b"\x1by" => self.reply(b"\x1b0"),
            b"\x1bu" => self.reply(b"SIMULATED EZ WRITER FIRMWARE 1.0 ......."),
            b"\x1bc" => self.mode = Mode::EraseMask,
            b"\x1bw" => self.mode = Mode::WriteStream,
            b"\x1br" => self.dump(),
            _ => {}
        }
    }

    fn dump(&mut self) {
        let mut stream = b"\x1bs".to_vec();
        for (number, track) in self.card.iter() {
            stream.extend_from_slice(&[ESC, *number]);
            if track.is_empty() {
                stream.extend_from_slice(b"\x1b*");
            } else {
                stream.extend_from_slice(track.as_bytes());
            }
        }
        stream.extend_from_slice(b"?\x1c\x1b0");
        self.reply(&stream);
    }

    /// Store a write stream, `ESC 's' (ESC <mask> <data>)*`.
    fn store(&mut self, stream: &[u8]) {
        assert!(stream.starts_with(b"\x1bs"), "Missing block start");
        let mut rest = &stream[2..];
        while !rest.is_empty() {
            assert_eq!(rest[0], ESC, "Missing track header");
            let number = TrackNumber::ALL
                .iter()
                .copied()
                .find(|n| rest[1] == 1 << **n)
                .expect("Invalid track header");
            let end = (2..rest.len())
                .find(|i| rest[*i] == ESC && rest.get(i + 1) != Some(&b'*'))
                .unwrap_or(rest.len());
            let payload = &rest[2..end];
            let data = if payload == b"\x1b*" || (!self.raw && payload.is_empty()) {
                Vec::new()
            } else if self.raw {
                payload.to_vec()
            } else {
                let start = if *number == 1 { b'%' } else { b';' };
                let mut data = vec![start];
                data.extend_from_slice(payload);
                data.push(b'?');
                data
            };
            self.card.set_track(number, Track::new(&data).expect("Track too long"));
            rest = &rest[end..];
        }
    }
}

impl std::io::Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut len = 0;
        while len < buf.len() {
            match self.output.pop_front() {
                Some(byte) => buf[len] = byte,
                None => break,
            }
            len += 1;
        }
        Ok(len)
    }
}

impl std::io::Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for byte in buf {
            self.input.push(*byte);
            self.process();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
