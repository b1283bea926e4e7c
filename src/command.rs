//! Fixed encodings of the device commands, and the response each one expects.

use core::fmt;

use crate::ascii::{Tuple, ACK, ESC};
use crate::types::{Coercivity, VERSION_LENGTH};

/// The commands understood by the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    /// Presence query, answered with `ESC '4'`.
    Present,
    /// Clears the device input buffer. There is no response.
    ResetBuffer,
    SelfTest,
    RamTest,
    CoercivityHigh,
    CoercivityLow,
    /// Request the 40 byte firmware version string.
    Version,
    /// Erase the tracks selected by the mask byte that follows the request.
    Erase,
    /// Start an ASCII dump of the next swiped card.
    ReadAscii,
    /// Start loading ASCII track data to be written to the next swiped card.
    WriteAscii,
}

/// The shape of the device reply to a [`Command`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing is sent back.
    None,
    /// A fixed two byte tuple.
    Tuple(Tuple),
    /// The given number of raw bytes.
    Raw(usize),
    /// A framed track data stream, see [`crate::stream`].
    TrackStream,
}

impl Command {
    /// The bytes sent to the device for this command.
    pub const fn request(self) -> &'static [u8] {
        use Command::*;
        match self {
            Present => b"9",
            ResetBuffer => &[ESC, b'a'],
            SelfTest => &[ESC, b'e'],
            RamTest => &[ESC, 0x87],
            CoercivityHigh => &[ESC, b'x'],
            CoercivityLow => &[ESC, b'y'],
            Version => &[ESC, b'u'],
            Erase => &[ESC, b'c'],
            ReadAscii => &[ESC, b'r'],
            WriteAscii => &[ESC, b'w'],
        }
    }

    /// The reply the device sends once the request has been transmitted.
    ///
    /// For `WriteAscii` the acknowledgement follows the track data, not the request.
    pub const fn reply(self) -> Reply {
        use Command::*;
        match self {
            Present => Reply::Tuple([ESC, b'4']),
            ResetBuffer | WriteAscii => Reply::None,
            SelfTest => Reply::Tuple([ESC, b'y']),
            RamTest | CoercivityHigh | CoercivityLow | Erase => Reply::Tuple(ACK),
            Version => Reply::Raw(VERSION_LENGTH),
            ReadAscii => Reply::TrackStream,
        }
    }

    pub const fn select_coercivity(coercivity: Coercivity) -> Self {
        match coercivity {
            Coercivity::High => Command::CoercivityHigh,
            Coercivity::Low => Command::CoercivityLow,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Command::*;
        f.write_str(match self {
            Present => "presence check",
            ResetBuffer => "reset buffer",
            SelfTest => "self test",
            RamTest => "RAM test",
            CoercivityHigh => "set high coercivity",
            CoercivityLow => "set low coercivity",
            Version => "version query",
            Erase => "erase",
            ReadAscii => "read",
            WriteAscii => "write",
        })
    }
}
