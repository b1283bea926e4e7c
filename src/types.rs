//! This module defines range-checked types for track numbers and track data,
//! and the card record exchanged by the read and write operations.

use snafu::{ensure, OptionExt, Snafu};

use arrayvec::ArrayVec;
use core::convert::{TryFrom, TryInto};
use core::fmt;
use core::ops::Deref;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a track number in \[1, 3\].
    #[snafu(display("Invalid track number"))]
    InvalidTrack,
    /// The track data doesn't fit in a [`Track`] buffer.
    #[snafu(display("Track data exceeds {} bytes", TRACK_CAPACITY))]
    TrackTooLong,
}

const fn invalid_track() -> InvalidTrackSnafu {
    InvalidTrackSnafu
}

/// Number of bytes a single track buffer can hold.
pub const TRACK_CAPACITY: usize = 128;

/// Length of the firmware version string sent by the device.
pub const VERSION_LENGTH: usize = 40;

/// `TrackNumber` is a range-checked \[1, 3\] integer, selecting one of the
/// three stripes on a card.
///
/// ## Example
/// ```
/// use ezwriter_proto::TrackNumber;
/// let t2 = TrackNumber::new(2).unwrap();
/// assert!(TrackNumber::new(4).is_err());
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct TrackNumber(u8);

/// Create a new [`TrackNumber`], panics if it is out of range.
pub const fn track(t: u8) -> TrackNumber {
    if t >= 1 && t <= 3 {
        return TrackNumber(t);
    }
    panic!("Invalid track number.")
}

impl TrackNumber {
    /// All tracks, in the order they are transmitted.
    pub const ALL: [TrackNumber; 3] = [TrackNumber(1), TrackNumber(2), TrackNumber(3)];

    /// Create a new track number, checking that it is in \[1, 3\].
    /// # Errors
    /// Returns [`Error::InvalidTrack`] if `track` is out of range.
    pub fn new(track: impl TryInto<u8>) -> Result<Self, Error> {
        let track = track.try_into().ok().with_context(invalid_track)?;
        ensure!((1..=3).contains(&track), invalid_track());
        Ok(Self(track))
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl Deref for TrackNumber {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<usize> for TrackNumber {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for TrackNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track {}", self.0)
    }
}

/// Fixed-capacity ASCII buffer holding the data of one track.
///
/// Like the device firmware, a track is NUL terminated: its logical content
/// ends at the first NUL byte, or at the end of the buffer if it has none.
#[derive(Clone, Default)]
pub struct Track(ArrayVec<u8, TRACK_CAPACITY>);

impl Track {
    /// An empty track.
    pub const fn empty() -> Self {
        Self(ArrayVec::new_const())
    }

    /// Create a track from raw bytes. Anything after the first NUL is dropped.
    /// # Errors
    /// Returns [`Error::TrackTooLong`] if the content exceeds [`TRACK_CAPACITY`].
    pub fn new(data: &[u8]) -> Result<Self, Error> {
        let len = data.iter().position(|b| *b == 0).unwrap_or(data.len());
        let mut buf = ArrayVec::new();
        buf.try_extend_from_slice(&data[..len])
            .map_err(|_| TrackTooLongSnafu.build())?;
        Ok(Self(buf))
    }

    /// The logical content of the track, up to the first NUL.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|b| *b == 0).unwrap_or(self.0.len());
        &self.0[..len]
    }

    /// Logical length of the track.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one byte received from the device.
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), Error> {
        self.0.try_push(byte).map_err(|_| TrackTooLongSnafu.build())
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl TryFrom<&str> for Track {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.as_bytes())
    }
}

impl core::str::FromStr for Track {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Track {}

impl PartialEq<&str> for Track {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

/// The data of all three tracks on a card.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct CardData {
    tracks: [Track; 3],
}

impl CardData {
    /// A card record with all tracks empty.
    pub const fn new() -> Self {
        Self {
            tracks: [Track::empty(), Track::empty(), Track::empty()],
        }
    }

    /// Build a card record from the contents of tracks 1, 2 and 3.
    /// # Errors
    /// Returns [`Error::TrackTooLong`] if any track doesn't fit.
    pub fn from_tracks(t1: &str, t2: &str, t3: &str) -> Result<Self, Error> {
        Ok(Self {
            tracks: [t1.parse()?, t2.parse()?, t3.parse()?],
        })
    }

    pub fn track(&self, track: TrackNumber) -> &Track {
        &self.tracks[track.index()]
    }

    pub fn track_mut(&mut self, track: TrackNumber) -> &mut Track {
        &mut self.tracks[track.index()]
    }

    pub fn set_track(&mut self, track: TrackNumber, data: Track) {
        self.tracks[track.index()] = data;
    }

    /// Iterate over `(track number, track)` pairs in transmission order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackNumber, &Track)> {
        TrackNumber::ALL.iter().copied().zip(self.tracks.iter())
    }
}

impl fmt::Display for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ISO Card Data:")?;
        for (number, track) in self.iter().filter(|(_, t)| !t.is_empty()) {
            writeln!(f, "{} (ASCII)\t{}", number, track)?;
        }
        Ok(())
    }
}

/// Magnetic coercivity of the card stock, selected before writing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Coercivity {
    High,
    Low,
}

/// Firmware version string, exactly as sent by the device.
///
/// Holds the 40 raw bytes with no NUL terminator appended.
#[derive(Clone, PartialEq, Eq)]
pub struct Version([u8; VERSION_LENGTH]);

impl Version {
    pub(crate) const fn from_bytes(bytes: [u8; VERSION_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
