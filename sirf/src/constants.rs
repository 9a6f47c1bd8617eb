pub const SIRF_START_CHAR_1: u8 = 0xa0;
pub const SIRF_START_CHAR_2: u8 = 0xa2;
pub const SIRF_END_CHAR_1: u8 = 0xb0;
pub const SIRF_END_CHAR_2: u8 = 0xb3;
pub(crate) const SIRF_START_SIZE: usize = 2;
pub(crate) const SIRF_LENGTH_SIZE: usize = 2;
pub(crate) const SIRF_HEADER_LEN: usize = SIRF_START_SIZE + SIRF_LENGTH_SIZE;
pub(crate) const SIRF_CHECKSUM_LEN: usize = 2;
pub(crate) const SIRF_END_SIZE: usize = 2;
/// Everything around the payload: markers, length and checksum
pub(crate) const SIRF_FRAME_OVERHEAD: usize = SIRF_HEADER_LEN + SIRF_CHECKSUM_LEN + SIRF_END_SIZE;

/// Largest payload the length field may announce
pub const SIRF_MAX_PAYLOAD_LEN: usize = 1022;
pub const SIRF_MAX_FRAME_LEN: usize = SIRF_MAX_PAYLOAD_LEN + SIRF_FRAME_OVERHEAD;
pub(crate) const SIRF_CHECKSUM_MASK: u16 = 0x7fff;

/// Standard Binary MIDs that carry a sub-ID byte
pub(crate) const SSB_SUB_ID_MIDS: [u8; 4] = [0x38, 0x40, 0x41, 0xe8];
/// Standard Binary MIDs copied through without a schema
pub(crate) const SSB_PASSTHROUGH_MIDS: core::ops::RangeInclusive<u8> = 0xb4..=0xc7;
/// AI3 MIDs that carry a sub-ID byte
pub(crate) const AI3_SUB_ID_MIDS: [u8; 10] = [
    0x45, 0x46, 0x49, 0x4a, 0x4b, 0xd3, 0xd4, 0xd5, 0xd7, 0xd8,
];

/// Receiver channels reported by the raw measurement messages
pub const SIRF_CHANNEL_COUNT: usize = 12;
pub const GPS_PRN_COUNT: usize = 32;

pub const RTCM_SYNC_CHAR: u8 = 0xd3;
pub(crate) const RTCM_HEADER_SIZE: usize = 3; // sync char (1) + length field (2)
pub(crate) const RTCM_CRC_SIZE: usize = 3;
pub(crate) const RTCM_LENGTH_MASK: u16 = 0x03ff; // 10 bits for length (6 bits reserved)
pub const RTCM_MAX_PAYLOAD_LEN: usize = 1023;

pub const NMEA_SYNC_CHAR: u8 = 0x24; // '$'
pub const NMEA_CHECKSUM_CHAR: u8 = 0x2a; // '*'
pub(crate) const NMEA_SATS_PER_GSV: usize = 4;

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// One light millisecond, the RTCM3 pseudorange modulus
pub const LIGHT_MS: f64 = SPEED_OF_LIGHT / 1000.0;
pub(crate) const SECONDS_PER_WEEK: f64 = 604_800.0;
