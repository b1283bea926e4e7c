//! Sans-IO parser for the track stream sent in response to the read command.
//!
//! The stream has the form
//! `ESC 's' (ESC <track> <data>)* '?' FS ESC '0'`,
//! where `<track>` is the raw byte 1, 2 or 3, and `<data>` is either the
//! track characters up to and including `?`, or `ESC '*'` for an empty track.
//!
//! Feed received bytes to [`ReadStream::receive_data`] until it returns
//! [`Progress::Done`]. [`ReadStream::bytes_wanted`] tells how many bytes can be
//! read without reading past the current token.

use arrayvec::ArrayVec;
use log::{debug, trace};

use crate::ascii::{Tuple, ACK};
use crate::framer::{
    BadBlockStartSnafu, BadStatusSnafu, FrameError, TrackFramer, TrackStep, TrailingDataSnafu,
    UnexpectedTupleSnafu,
};
use crate::nom_parser::{parse_block_start, parse_status, parse_track_tuple, StreamToken};
use crate::types::CardData;

#[derive(Debug)]
enum ReadState {
    AwaitBlockStart,
    AwaitTupleType,
    /// Copying track data, or `AwaitEscapedSentinel` when the framer is escaped.
    CopyingTrack(TrackFramer),
    AwaitStatus,
    Done,
    Faulted,
}

/// Result of feeding data to a [`ReadStream`].
#[derive(Debug, PartialEq)]
pub enum Progress {
    NeedData,
    Done(CardData),
}

/// State machine for the read stream.
#[derive(Debug)]
pub struct ReadStream {
    state: ReadState,
    tuple: ArrayVec<u8, 2>,
    card: CardData,
}

impl ReadStream {
    /// A parser waiting for the data block start. The card record starts out empty.
    pub fn new() -> Self {
        Self {
            state: ReadState::AwaitBlockStart,
            tuple: ArrayVec::new(),
            card: CardData::new(),
        }
    }

    /// Number of bytes that may be read before the stream needs to be consulted again.
    pub fn bytes_wanted(&self) -> usize {
        match self.state {
            ReadState::AwaitBlockStart | ReadState::AwaitTupleType | ReadState::AwaitStatus => {
                self.tuple.remaining_capacity()
            }
            ReadState::CopyingTrack(_) => 1,
            ReadState::Done | ReadState::Faulted => 0,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ReadState::Done)
    }

    /// Feed data into the parser, one byte at a time.
    ///
    /// Any framing error is terminal, later calls fail with
    /// [`FrameError::TrailingData`].
    pub fn receive_data(&mut self, data: &[u8]) -> Result<Progress, FrameError> {
        for byte in data {
            if let Err(e) = self.receive_byte(*byte) {
                self.state = ReadState::Faulted;
                return Err(e);
            }
        }
        if self.is_done() {
            Ok(Progress::Done(core::mem::take(&mut self.card)))
        } else {
            Ok(Progress::NeedData)
        }
    }

    fn receive_byte(&mut self, byte: u8) -> Result<(), FrameError> {
        use StreamToken::*;

        let state = core::mem::replace(&mut self.state, ReadState::Faulted);
        self.state = match state {
            ReadState::CopyingTrack(mut framer) => {
                let track = self.card.track_mut(framer.track());
                match framer.receive_byte(byte, track)? {
                    TrackStep::Continue => ReadState::CopyingTrack(framer),
                    TrackStep::EndOfTrack => {
                        debug!("{} complete, {} bytes", framer.track(), track.len());
                        ReadState::AwaitTupleType
                    }
                }
            }
            ReadState::Done | ReadState::Faulted => return TrailingDataSnafu.fail(),
            tuple_state => {
                self.tuple.push(byte);
                let token = match tuple_state {
                    ReadState::AwaitBlockStart => parse_block_start(&self.tuple),
                    ReadState::AwaitStatus => parse_status(&self.tuple),
                    _ => parse_track_tuple(&self.tuple),
                };
                if token != NeedData {
                    trace!("Tuple {:02x?}: {:?}", self.tuple.as_slice(), token);
                    self.tuple.clear();
                }
                match token {
                    NeedData => tuple_state,
                    BlockStart => ReadState::AwaitTupleType,
                    TrackStart(number) => {
                        // A track announced twice is overwritten from its start
                        self.card.track_mut(number).clear();
                        ReadState::CopyingTrack(TrackFramer::new(number))
                    }
                    EndOfData => ReadState::AwaitStatus,
                    Status(ACK) => ReadState::Done,
                    Status(received) => return BadStatusSnafu { received }.fail(),
                    Other(received) => return unexpected(&tuple_state, received),
                }
            }
        };
        Ok(())
    }
}

fn unexpected(state: &ReadState, received: Tuple) -> Result<(), FrameError> {
    match state {
        ReadState::AwaitBlockStart => BadBlockStartSnafu { received }.fail(),
        _ => UnexpectedTupleSnafu { received }.fail(),
    }
}

impl Default for ReadStream {
    fn default() -> Self {
        Self::new()
    }
}
