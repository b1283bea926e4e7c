//! Control bytes and fixed tuples of the escape-coded wire format.

/// A two byte control sequence, used both as command prefix and as response marker.
pub type Tuple = [u8; 2];

pub const ESC: u8 = 0x1b;
pub const FS: u8 = 0x1c;

/// Terminates the data of a single track in the read stream.
pub const TRACK_END: u8 = b'?';
/// Follows `ESC` in place of track data when a track is empty.
pub const EMPTY_MARKER: u8 = b'*';

pub const ACK: Tuple = [ESC, b'0'];
pub const BLOCK_START: Tuple = [ESC, b's'];
pub const END_OF_DATA: Tuple = [TRACK_END, FS];
pub const EMPTY_TRACK: Tuple = [ESC, EMPTY_MARKER];
