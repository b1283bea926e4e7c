//! Protocol engine for magnetic stripe card reader/writers speaking the
//! escape-coded "EZ Writer" command set over a serial line.
//!
//! The [`Engine`] drives the device over any blocking `Read + Write` byte
//! channel. It initializes the device, and reads, writes and erases cards
//! holding up to three tracks of ASCII data.
//!
//! The read stream parser, [`stream::ReadStream`], is sans-IO and can be used
//! on its own.
//!
//! ## Example
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ezwriter_proto::serial::{self, SerialSettings};
//! use ezwriter_proto::{Coercivity, Engine};
//!
//! let port = serial::open("/dev/ttyUSB0", &SerialSettings::default())?;
//! let mut device = Engine::new(port);
//! device.initialize()?;
//! let card = device.read()?;
//! device.write(Coercivity::High, &card)?;
//! # Ok(()) }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod ascii;
pub mod command;
pub mod config;
pub mod engine;
pub mod framer;
mod nom_parser;
#[cfg(feature = "serial")]
pub mod serial;
pub mod stream;
pub mod types;

pub use command::Command;
pub use config::{Config, MaskEncoding, WritePolicy};
pub use engine::{Engine, EngineState, Error, ErrorKind};
pub use framer::FrameError;
pub use types::{track, CardData, Coercivity, Track, TrackNumber, Version, TRACK_CAPACITY};
