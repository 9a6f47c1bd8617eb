//! Message identification and the encode/decode entry points.
//!
//! A payload starts with the message ID (MID). Some MIDs are followed by a
//! sub-ID (SID); which ones is fixed per protocol. The remaining bytes are
//! the body, decoded by the schema registered for that `(MID, SID)` pair.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    bits::{WireReader, WireWriter},
    constants::{AI3_SUB_ID_MIDS, SIRF_MAX_PAYLOAD_LEN, SSB_PASSTHROUGH_MIDS, SSB_SUB_ID_MIDS},
    error::CodecError,
    scanner::{frame_payload, RawPacket},
};

pub mod ai3;
pub mod f;
pub mod ssb;

pub use ai3::Ai3Message;
pub use f::FMessage;
pub use ssb::SsbMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Protocol {
    /// Standard Binary, the receiver's native command/response protocol
    Ssb,
    /// Aiding protocol between a location client and an assistance server
    Ai3,
    /// Session control between a location client and a control point
    F,
}

impl Protocol {
    pub const fn name(self) -> &'static str {
        match self {
            Protocol::Ssb => "SSB",
            Protocol::Ai3 => "AI3",
            Protocol::F => "F",
        }
    }

    /// Whether a SID byte follows `mid` on the wire
    pub fn has_sub_id(self, mid: u8) -> bool {
        match self {
            Protocol::Ssb => SSB_SUB_ID_MIDS.contains(&mid),
            Protocol::Ai3 => AI3_SUB_ID_MIDS.contains(&mid),
            Protocol::F => false,
        }
    }

    /// Whether `mid` is copied verbatim instead of schema decoded
    pub fn is_passthrough(self, mid: u8) -> bool {
        match self {
            Protocol::Ssb => SSB_PASSTHROUGH_MIDS.contains(&mid),
            Protocol::Ai3 | Protocol::F => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageId {
    pub protocol: Protocol,
    pub mid: u8,
    pub sid: Option<u8>,
}

impl MessageId {
    pub const fn new(protocol: Protocol, mid: u8, sid: Option<u8>) -> Self {
        Self { protocol, mid, sid }
    }

    /// MID byte plus the optional SID byte
    pub const fn header_len(&self) -> usize {
        if self.sid.is_some() {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sid {
            Some(sid) => write!(f, "{} {:#04x}/{:#04x}", self.protocol.name(), self.mid, sid),
            None => write!(f, "{} {:#04x}", self.protocol.name(), self.mid),
        }
    }
}

/// Static description and body codec of one message kind.
///
/// Implemented by `#[sirf_packet]`; the body excludes the MID and SID bytes.
pub trait SirfPacket: Sized {
    const NAME: &'static str;
    const MID: u8;
    const SID: Option<u8>;
    /// Body size without count-prefixed groups and trailing blobs
    const FIXED_LEN: usize;

    fn body_len(&self) -> usize;
    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, CodecError>;
    fn encode_body(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError>;
}

/// Decodes a body that must be consumed completely
pub(crate) fn decode_exact<P: SirfPacket>(body: &[u8]) -> Result<P, CodecError> {
    let mut r = WireReader::new(P::NAME, body);
    let packet = P::decode_body(&mut r)?;
    r.finish()?;
    Ok(packet)
}

/// Body of a message in the pass-through window, kept as is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Passthrough {
    pub mid: u8,
    pub payload: Vec<u8>,
}

impl Passthrough {
    pub const NAME: &'static str = "Passthrough";

    pub fn message_id(&self, protocol: Protocol) -> MessageId {
        MessageId::new(protocol, self.mid, None)
    }

    pub fn body_len(&self) -> usize {
        self.payload.len()
    }

    pub fn encode_body(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
        w.write_bytes(&self.payload)
    }
}

/// A decoded message of any protocol
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Message {
    Ssb(SsbMessage),
    Ai3(Ai3Message),
    F(FMessage),
}

impl Message {
    pub fn protocol(&self) -> Protocol {
        match self {
            Message::Ssb(_) => Protocol::Ssb,
            Message::Ai3(_) => Protocol::Ai3,
            Message::F(_) => Protocol::F,
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            Message::Ssb(m) => m.message_id(),
            Message::Ai3(m) => m.message_id(),
            Message::F(m) => m.message_id(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Message::Ssb(m) => m.name(),
            Message::Ai3(m) => m.name(),
            Message::F(m) => m.name(),
        }
    }

    fn body_len(&self) -> usize {
        match self {
            Message::Ssb(m) => m.body_len(),
            Message::Ai3(m) => m.body_len(),
            Message::F(m) => m.body_len(),
        }
    }

    fn encode_body(&self, w: &mut WireWriter<'_>) -> Result<(), CodecError> {
        match self {
            Message::Ssb(m) => m.encode_body(w),
            Message::Ai3(m) => m.encode_body(w),
            Message::F(m) => m.encode_body(w),
        }
    }
}

impl From<SsbMessage> for Message {
    fn from(x: SsbMessage) -> Self {
        Message::Ssb(x)
    }
}

impl From<Ai3Message> for Message {
    fn from(x: Ai3Message) -> Self {
        Message::Ai3(x)
    }
}

impl From<FMessage> for Message {
    fn from(x: FMessage) -> Self {
        Message::F(x)
    }
}

/// Splits the header off `payload` and decodes the body.
///
/// The body must match its schema exactly: short bodies, counts the body
/// cannot hold and leftover bytes are all [`CodecError::Length`].
pub fn decode_packet(
    protocol: Protocol,
    payload: &[u8],
) -> Result<(MessageId, Message), CodecError> {
    let (&mid, rest) = payload.split_first().ok_or(CodecError::Length {
        packet: "header",
        expect: 1,
        got: 0,
    })?;
    let (sid, body) = if protocol.has_sub_id(mid) {
        let (&sid, body) = rest.split_first().ok_or(CodecError::Length {
            packet: "header",
            expect: 2,
            got: 1,
        })?;
        (Some(sid), body)
    } else {
        (None, rest)
    };
    let id = MessageId::new(protocol, mid, sid);

    let message = match protocol {
        Protocol::Ssb if protocol.is_passthrough(mid) => {
            Message::Ssb(SsbMessage::Passthrough(Passthrough {
                mid,
                payload: body.to_vec(),
            }))
        },
        Protocol::Ssb => Message::Ssb(SsbMessage::decode_body(mid, sid, body)?),
        Protocol::Ai3 => Message::Ai3(Ai3Message::decode_body(mid, sid, body)?),
        Protocol::F => Message::F(FMessage::decode_body(mid, sid, body)?),
    };
    Ok((id, message))
}

/// Validates the frame checksum, then decodes its payload
pub fn decode_frame(
    protocol: Protocol,
    packet: &RawPacket,
) -> Result<(MessageId, Message), CodecError> {
    packet.validate_checksum()?;
    decode_packet(protocol, &packet.payload)
}

/// Serialises `message` into a payload of at most `capacity` bytes.
///
/// The size is computed first; nothing is written when it exceeds
/// `capacity` or the protocol maximum of 1022 bytes.
pub fn encode_message(
    protocol: Protocol,
    message: &Message,
    capacity: usize,
) -> Result<Vec<u8>, CodecError> {
    if message.protocol() != protocol {
        return Err(CodecError::InvalidParameter(
            "message belongs to another protocol",
        ));
    }
    let id = message.message_id();
    if protocol.has_sub_id(id.mid) != id.sid.is_some() {
        return Err(CodecError::InvalidParameter(
            "sub-ID presence does not match the MID",
        ));
    }
    if let Message::Ssb(SsbMessage::Passthrough(ref p)) = *message {
        if !protocol.is_passthrough(p.mid) {
            return Err(CodecError::InvalidParameter(
                "pass-through MID outside the reserved window",
            ));
        }
    }

    let total = id.header_len() + message.body_len();
    let limit = capacity.min(SIRF_MAX_PAYLOAD_LEN);
    if total > limit {
        return Err(CodecError::Length {
            packet: message.name(),
            expect: total,
            got: limit,
        });
    }

    let mut out = vec![0u8; total];
    let mut w = WireWriter::new(message.name(), &mut out);
    w.write(&id.mid)?;
    if let Some(sid) = id.sid {
        w.write(&sid)?;
    }
    message.encode_body(&mut w)?;
    debug_assert_eq!(w.position(), total);
    Ok(out)
}

/// [`encode_message`] followed by framing
pub fn encode_frame(protocol: Protocol, message: &Message) -> Result<Vec<u8>, CodecError> {
    let payload = encode_message(protocol, message, SIRF_MAX_PAYLOAD_LEN)?;
    frame_payload(&payload)
}
