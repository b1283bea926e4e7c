use nom::branch::alt;
use nom::combinator::{map, map_res, value, verify};
use nom::number::streaming::u8;
use nom::sequence::{pair, preceded};
use nom::Err::Incomplete;
use nom::IResult;

use crate::ascii::*;
use crate::types::TrackNumber;

type Buf = [u8];

/// Tuples that may appear between tracks in the read stream.
#[derive(PartialEq, Copy, Clone, Debug)]
pub(crate) enum StreamToken {
    BlockStart,
    TrackStart(TrackNumber),
    EndOfData,
    Status(Tuple),
    Other(Tuple),
    NeedData,
}

/// The first tuple after the read command, `ESC 's'`.
pub(crate) fn parse_block_start(buf: &Buf) -> StreamToken {
    parse_token(alt((value(StreamToken::BlockStart, tuple(BLOCK_START)), other))(buf))
}

/// The tuple that follows the block start, or the end of a track.
pub(crate) fn parse_track_tuple(buf: &Buf) -> StreamToken {
    parse_token(alt((
        track_start,
        value(StreamToken::EndOfData, tuple(END_OF_DATA)),
        other,
    ))(buf))
}

/// Final status after the end-of-data tuple.
pub(crate) fn parse_status(buf: &Buf) -> StreamToken {
    parse_token(map(pair(u8, u8), |(a, b)| StreamToken::Status([a, b]))(buf))
}

fn parse_token(result: IResult<&Buf, StreamToken>) -> StreamToken {
    match result {
        Ok((_buf, token)) => token,
        Err(Incomplete(_)) => StreamToken::NeedData,
        // `other` accepts any two bytes, so only a short buffer ends up here
        Err(_) => StreamToken::NeedData,
    }
}

fn track_start(buf: &Buf) -> IResult<&Buf, StreamToken> {
    map(
        preceded(byte(ESC), map_res(u8, |n: u8| TrackNumber::new(n))),
        StreamToken::TrackStart,
    )(buf)
}

fn other(buf: &Buf) -> IResult<&Buf, StreamToken> {
    map(pair(u8, u8), |(a, b)| StreamToken::Other([a, b]))(buf)
}

fn tuple<'a>(expected: Tuple) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, ()> {
    map(pair(byte(expected[0]), byte(expected[1])), |_| ())
}

fn byte<'a>(expected: u8) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, u8> {
    verify(u8, move |b: &u8| *b == expected)
}
