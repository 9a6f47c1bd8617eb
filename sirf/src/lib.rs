//! # sirf
//!
//! Framing and message codecs for SiRF GPS receivers: the Standard Binary
//! protocol (SSB) spoken by the receiver itself, the AI3 aiding protocol and
//! the F session control protocol. On top of the codec sit a navigation
//! subframe validator, an epoch aggregator emitting RTCM3 message 1002 and
//! an NMEA 0183 writer.
//!
//! Scanning Frames
//! ===============
//!
//! Frames are cut out of a byte stream by a [`FrameScanner`] reading from
//! any [`ByteSource`]. Noise between frames is skipped and counted, a false
//! start marker is reported once and scanning resumes right after it:
//! ```
//! use sirf::{decode_frame, FrameScanner, FramingStatus, Message, Protocol, SliceSource};
//!
//! let data = [0x55, 0xa0, 0xa2, 0x00, 0x02, 0x12, 0x01, 0x00, 0x13, 0xb0, 0xb3];
//! let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::new(&data));
//! let packet = scanner.scan_frame().unwrap();
//! assert_eq!(packet.skipped, 1);
//!
//! let (id, message) = decode_frame(Protocol::Ssb, &packet).unwrap();
//! assert_eq!(id.mid, 0x12);
//! assert!(matches!(message, Message::Ssb(_)));
//! assert_eq!(scanner.scan_frame(), Err(FramingStatus::NeedMoreData));
//! ```
//!
//! Building Frames
//! ===============
//!
//! Every message kind is a plain struct; wrap it into [`Message`] and hand
//! it to [`encode_frame`]:
//! ```
//! use sirf::{codec::ssb::PollSoftwareVersion, encode_frame, Message, Protocol, SsbMessage};
//!
//! let poll = Message::Ssb(SsbMessage::from(PollSoftwareVersion { control: 0 }));
//! let frame = encode_frame(Protocol::Ssb, &poll).unwrap();
//! assert_eq!(frame, [0xa0, 0xa2, 0x00, 0x02, 0x84, 0x00, 0x00, 0x84, 0xb0, 0xb3]);
//! ```

#[cfg(feature = "serde")]
extern crate serde;

pub use crate::{
    bits::{BitReader, BitWriter, WireField, WireReader, WireWriter, I24, U24},
    checksum::{crc24q, nmea_checksum, SirfChecksumCalc},
    codec::{
        decode_frame, decode_packet, encode_frame, encode_message, Ai3Message, FMessage, Message,
        MessageId, Passthrough, Protocol, SirfPacket, SsbMessage,
    },
    epoch::{AggregatorConfig, ChannelMeasurement, Epoch, EpochAggregator},
    error::{BitError, CodecError, EpochError, NavError, NmeaError, Rtcm3Error},
    nav::{ChangeFlags, NavSubframeValidator, NavigationRecord, SatelliteNavState},
    nmea::{NmeaConfig, NmeaFix, NmeaWriter, Sentence},
    rtcm3::{Msg1002, Msg1002Header, Msg1002Satellite},
    scanner::{
        frame_payload, ByteSource, FrameScanner, Frames, FramingStatus, IoSource, RawPacket,
        SliceSource,
    },
};

mod bits;
mod checksum;
pub mod codec;
pub mod constants;
pub mod epoch;
mod error;
pub mod nav;
pub mod nmea;
pub mod rtcm3;
mod scanner;
