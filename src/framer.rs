//! Conversion between track data and its escape-delimited wire form.
//!
//! In the read direction the device sends each track as its raw characters,
//! ending with the `?` end sentinel, or as `ESC '*'` if the track is empty.
//! In the write direction each track is preceded by an `ESC <track>` header.

use arrayvec::ArrayVec;
use snafu::{ResultExt, Snafu};

use crate::ascii::{Tuple, EMPTY_MARKER, EMPTY_TRACK, ESC, TRACK_END};
use crate::config::{MaskEncoding, WritePolicy};
use crate::types::{Track, TrackNumber, TRACK_CAPACITY};

/// Errors in the framing of the read stream.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum FrameError {
    /// The stream didn't start with `ESC 's'`.
    #[snafu(display("Expected data block start, received {:02x?}", received))]
    BadBlockStart { received: Tuple },
    /// A tuple between tracks was neither a track start nor the end of data.
    #[snafu(display("Unexpected tuple {:02x?} in track stream", received))]
    UnexpectedTuple { received: Tuple },
    /// An escape inside track data wasn't followed by the empty track marker.
    #[snafu(display("{}: expected empty track marker, received {:#04x}", track, received))]
    BadEmptyMarker { track: TrackNumber, received: u8 },
    #[snafu(display("{}: more than {} bytes of data", track, TRACK_CAPACITY))]
    TrackOverflow {
        track: TrackNumber,
        source: crate::types::Error,
    },
    /// The status following the end of data wasn't `ESC '0'`.
    #[snafu(display("Read failed with status {:02x?}", received))]
    BadStatus { received: Tuple },
    /// Data was received after the stream was complete.
    #[snafu(display("Received data after the end of the track stream"))]
    TrailingData,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FramerState {
    /// Copying track bytes to the track buffer.
    Copying,
    /// The previous byte was `ESC`.
    Escaped,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum TrackStep {
    Continue,
    /// The track is complete, the next tuple follows.
    EndOfTrack,
}

/// Byte-at-a-time tokenizer for the data of one track.
#[derive(Debug)]
pub(crate) struct TrackFramer {
    track: TrackNumber,
    state: FramerState,
}

impl TrackFramer {
    pub(crate) const fn new(track: TrackNumber) -> Self {
        Self {
            track,
            state: FramerState::Copying,
        }
    }

    pub(crate) const fn track(&self) -> TrackNumber {
        self.track
    }

    /// Consume one byte of the track, appending it to `dest` where appropriate.
    pub(crate) fn receive_byte(
        &mut self,
        byte: u8,
        dest: &mut Track,
    ) -> Result<TrackStep, FrameError> {
        match self.state {
            FramerState::Copying if byte == ESC => {
                self.state = FramerState::Escaped;
                Ok(TrackStep::Continue)
            }
            FramerState::Copying => {
                dest.push(byte).context(TrackOverflowSnafu { track: self.track })?;
                if byte == TRACK_END {
                    Ok(TrackStep::EndOfTrack)
                } else {
                    Ok(TrackStep::Continue)
                }
            }
            FramerState::Escaped if byte == EMPTY_MARKER => Ok(TrackStep::EndOfTrack),
            FramerState::Escaped => BadEmptyMarkerSnafu {
                track: self.track,
                received: byte,
            }
            .fail(),
        }
    }
}

const FRAME_CAPACITY: usize = TRACK_CAPACITY + 2;

/// Header and payload of one track in the write stream.
pub(crate) type TrackFrame = ArrayVec<u8, FRAME_CAPACITY>;

/// Encode a track for the write stream.
pub(crate) fn encode_track(
    number: TrackNumber,
    track: &Track,
    policy: WritePolicy,
    encoding: MaskEncoding,
) -> TrackFrame {
    let mut frame = TrackFrame::new();
    frame.push(ESC);
    frame.push(encoding.mask(number));

    let data = track.as_bytes();
    let payload: &[u8] = match policy {
        WritePolicy::TrimSentinels if data.len() < 2 => &[],
        WritePolicy::TrimSentinels => &data[1..data.len() - 1],
        WritePolicy::Raw if data.is_empty() => &EMPTY_TRACK,
        WritePolicy::Raw => data,
    };
    // payload is at most TRACK_CAPACITY bytes
    frame.extend(payload.iter().copied());
    frame
}
