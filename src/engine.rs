//! Blocking protocol engine, driving the device over any `Read + Write` byte channel.
//!
//! See [`Engine`] for more details.

use std::io::{Read, Write};

use log::{debug, trace, warn};
use snafu::{ensure, ResultExt, Snafu};

use crate::ascii::{Tuple, ACK, BLOCK_START, END_OF_DATA};
use crate::command::{Command, Reply};
use crate::config::Config;
use crate::framer::{encode_track, FrameError};
use crate::stream::{Progress, ReadStream};
use crate::types::{CardData, Coercivity, TrackNumber, Version, VERSION_LENGTH};

/// Error type for the engine operations.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The byte channel failed to read or write the full data.
    #[snafu(display("I/O error during {}: {}", command, source))]
    Io {
        command: Command,
        source: std::io::Error,
    },
    /// The device sent something other than the expected response.
    #[snafu(display(
        "Unexpected response to {}: expected {:02x?}, received {:02x?}",
        command,
        expected,
        received
    ))]
    UnexpectedResponse {
        command: Command,
        expected: Tuple,
        received: Tuple,
    },
    /// The track stream sent in response to a read was malformed.
    #[snafu(display("Malformed read response: {}", source))]
    Framing { source: FrameError },
    /// The erase mask is empty, or selects tracks that don't exist.
    #[snafu(display("Invalid track mask {:#04x}", mask))]
    InvalidMask { mask: u8 },
    /// The device must be initialized before use.
    #[snafu(display("Device not ready, state is {:?}", state))]
    NotReady { state: EngineState },
}

/// Classification of [`Error`]s.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte channel failed.
    Channel,
    /// The device response didn't follow the protocol.
    Protocol,
    /// The caller supplied invalid arguments. Nothing was sent to the device.
    Precondition,
    /// The operation requires an initialized device. Nothing was sent to the device.
    Sequencing,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Channel,
            Error::UnexpectedResponse { .. } | Error::Framing { .. } => ErrorKind::Protocol,
            Error::InvalidMask { .. } => ErrorKind::Precondition,
            Error::NotReady { .. } => ErrorKind::Sequencing,
        }
    }

    fn faults_device(&self) -> bool {
        matches!(self.kind(), ErrorKind::Channel | ErrorKind::Protocol)
    }
}

/// Initialization state of the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// The device answered the presence check.
    Present,
    /// The self test and RAM test passed.
    Tested,
    /// Initialization is complete.
    Ready,
    /// An operation failed, the device must be initialized again.
    Faulted,
}

/// Protocol engine for one device.
///
/// The engine owns the byte channel for its lifetime, and only one operation
/// can be in progress at a time. Every operation blocks until the device has
/// answered, so reads and writes wait for a card to be swiped.
///
/// # Example
///
/// ```no_run
/// use ezwriter_proto::{CardData, Coercivity, Config, Engine, EngineState};
/// # use std::io::Cursor;
/// # fn connect_serial_interface() -> Result<Cursor<Vec<u8>>, &'static str> {
/// #     Ok(Cursor::new(Vec::new()))
/// # }
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let serial = connect_serial_interface()?;
/// let config = Config::default().with_settle_delay(std::time::Duration::ZERO);
/// let mut device = Engine::with_config(serial, config);
///
/// device.initialize()?;
/// assert_eq!(device.state(), EngineState::Ready);
///
/// let card: CardData = device.read()?;
/// print!("{}", card);
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Engine<IO> {
    io: IO,
    state: EngineState,
    config: Config,
}

impl<IO> Engine<IO>
where
    IO: Read + Write,
{
    /// Create an engine with the default configuration.
    pub fn new(io: IO) -> Self {
        Self::with_config(io, Config::default())
    }

    pub fn with_config(io: IO, config: Config) -> Self {
        Self {
            io,
            state: EngineState::Uninitialized,
            config,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the byte channel. Dropping it closes the device.
    pub fn into_inner(self) -> IO {
        self.io
    }

    pub fn get_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Check that the device is present, run its self tests, and clear its
    /// input buffer before and after the tests.
    ///
    /// This also recovers an engine in the `Faulted` state.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.state = EngineState::Uninitialized;
        let result = self.run_initialize();
        self.track_fault(result)
    }

    fn run_initialize(&mut self) -> Result<(), Error> {
        self.exchange(Command::Present)?;
        self.set_state(EngineState::Present);
        self.reset_buffer()?;
        self.exchange(Command::SelfTest)?;
        self.exchange(Command::RamTest)?;
        self.set_state(EngineState::Tested);
        self.reset_buffer()?;
        self.set_state(EngineState::Ready);
        Ok(())
    }

    /// Read the next swiped card.
    pub fn read(&mut self) -> Result<CardData, Error> {
        self.ensure_ready()?;
        let result = self.run_read();
        self.track_fault(result)
    }

    fn run_read(&mut self) -> Result<CardData, Error> {
        let command = Command::ReadAscii;
        self.send(command, command.request())?;

        let mut stream = ReadStream::new();
        let mut buf = [0; 2];
        loop {
            let data = &mut buf[..stream.bytes_wanted()];
            self.io.read_exact(data).context(IoSnafu { command })?;
            trace!("Received {:02x?}", data);
            if let Progress::Done(card) = stream.receive_data(data).context(FramingSnafu)? {
                return Ok(card);
            }
        }
    }

    /// Erase the tracks selected by `mask` on the next swiped card.
    ///
    /// The mask is encoded according to [`Config::mask_encoding`], use
    /// [`erase_tracks`](Self::erase_tracks) to build it from track numbers.
    pub fn erase(&mut self, mask: u8) -> Result<(), Error> {
        self.ensure_ready()?;
        ensure!(self.config.mask_encoding.is_valid(mask), InvalidMaskSnafu { mask });
        let result = self.run_erase(mask);
        self.track_fault(result)
    }

    pub fn erase_tracks(&mut self, tracks: &[TrackNumber]) -> Result<(), Error> {
        self.erase(self.config.mask_encoding.mask_for(tracks))
    }

    fn run_erase(&mut self, mask: u8) -> Result<(), Error> {
        let command = Command::Erase;
        self.send(command, command.request())?;
        self.send(command, &[mask])?;
        self.expect_reply(command)
    }

    /// Write `card` to the next swiped card, using the given coercivity.
    pub fn write(&mut self, coercivity: Coercivity, card: &CardData) -> Result<(), Error> {
        self.ensure_ready()?;
        let result = self.run_write(coercivity, card);
        self.track_fault(result)
    }

    fn run_write(&mut self, coercivity: Coercivity, card: &CardData) -> Result<(), Error> {
        self.exchange(Command::select_coercivity(coercivity))?;

        let command = Command::WriteAscii;
        self.exchange(command)?;
        self.send(command, &BLOCK_START)?;
        for (number, track) in card.iter() {
            let frame = encode_track(
                number,
                track,
                self.config.write_policy,
                self.config.mask_encoding,
            );
            debug!("Writing {}, {} bytes", number, track.len());
            self.send(command, &frame)?;
        }
        self.send(command, &END_OF_DATA)?;
        self.receive_tuple(command, ACK)
    }

    /// Query the firmware version string.
    pub fn version(&mut self) -> Result<Version, Error> {
        self.ensure_ready()?;
        let result = self.run_version();
        self.track_fault(result)
    }

    fn run_version(&mut self) -> Result<Version, Error> {
        let command = Command::Version;
        self.send(command, command.request())?;
        let mut version = [0; VERSION_LENGTH];
        self.io
            .read_exact(&mut version)
            .context(IoSnafu { command })?;
        Ok(Version::from_bytes(version))
    }

    fn reset_buffer(&mut self) -> Result<(), Error> {
        self.exchange(Command::ResetBuffer)?;
        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }
        Ok(())
    }

    /// Send the request of a command with a fixed reply, and check the reply.
    fn exchange(&mut self, command: Command) -> Result<(), Error> {
        self.send(command, command.request())?;
        self.expect_reply(command)
    }

    fn expect_reply(&mut self, command: Command) -> Result<(), Error> {
        match command.reply() {
            Reply::Tuple(expected) => self.receive_tuple(command, expected),
            _ => Ok(()),
        }
    }

    fn send(&mut self, command: Command, data: &[u8]) -> Result<(), Error> {
        debug!("Sending {}", command);
        trace!("Sending {:02x?}", data);
        self.io.write_all(data).context(IoSnafu { command })
    }

    fn receive_tuple(&mut self, command: Command, expected: Tuple) -> Result<(), Error> {
        let mut received = [0; 2];
        self.io
            .read_exact(&mut received)
            .context(IoSnafu { command })?;
        trace!("Received {:02x?}", received);
        ensure!(
            received == expected,
            UnexpectedResponseSnafu {
                command,
                expected,
                received
            }
        );
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), Error> {
        ensure!(
            self.state == EngineState::Ready,
            NotReadySnafu { state: self.state }
        );
        Ok(())
    }

    fn set_state(&mut self, state: EngineState) {
        debug!("Device state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn track_fault<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            if err.faults_device() {
                warn!("Device fault: {}", err);
                self.set_state(EngineState::Faulted);
            }
        }
        result
    }
}
