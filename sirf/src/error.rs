use thiserror::Error;

use crate::codec::MessageId;

/// Error that possible during message encoding and decoding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Declared or required size exceeds the buffer, in either direction
    #[error("Invalid packet({packet}) length, expect {expect}, got {got}")]
    Length {
        packet: &'static str,
        expect: usize,
        got: usize,
    },
    #[error("No schema for message {id}")]
    UnknownId { id: MessageId },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("Invalid field {field} of packet {packet}")]
    InvalidField {
        packet: &'static str,
        field: &'static str,
    },
    #[error("Not valid packet's checksum, expect {expect:x}, got {got:x}")]
    InvalidChecksum { expect: u16, got: u16 },
}

/// Bit level packing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("Bit width {asked} outside 1..={max}")]
    TooLongForType { max: u8, asked: u8 },
    #[error("Asked for {asked} bits, {available} available")]
    OutOfBounds { asked: usize, available: usize },
    #[error("Value {value} does not fit in {bits} bits")]
    Overflow { value: i64, bits: u8 },
}

/// Rejections raised by the navigation subframe validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("PRN {0} outside 1..=32")]
    InvalidPrn(u8),
    #[error("Subframe {0} carries no clock or ephemeris data")]
    UnsupportedSubframe(u8),
    #[error("Subframe {0} could not be decoded")]
    Undecodable(u8),
}

/// Rejections raised by the epoch aggregator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EpochError {
    #[error("Channel {channel} outside 0..{max}")]
    ChannelOutOfRange { channel: u8, max: usize },
    #[error("RTCM3 encoding failed: {0}")]
    Encode(#[from] CodecError),
    #[error("RTCM3 bit packing failed: {0}")]
    Bits(#[from] BitError),
}

/// Failures reading back an RTCM3 frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rtcm3Error {
    #[error("Frame does not start with 0xd3")]
    Preamble,
    #[error("Frame truncated, expect {expect} bytes, got {got}")]
    Truncated { expect: usize, got: usize },
    #[error("Not valid frame CRC, expect {expect:06x}, got {got:06x}")]
    InvalidCrc { expect: u32, got: u32 },
    #[error("Unexpected message number {0}")]
    MessageNumber(u16),
    #[error(transparent)]
    Bits(#[from] BitError),
}

/// Failures building NMEA sentences
#[derive(Debug, Error)]
pub enum NmeaError {
    #[error("Fix carries an invalid UTC date or time")]
    InvalidDate,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
