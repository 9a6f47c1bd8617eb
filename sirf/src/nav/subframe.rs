//! GPS LNAV subframes 1 to 3 as carried by 50 bps messages.
//!
//! A word travels in a u32: bits 31/30 repeat D29*/D30* of the previous
//! word, bits 29..0 hold the 30 transmitted bits, D1 first. The bit layout
//! itself is interpreted by [`gnss_protos::GpsQzssDecoder`].

use gnss_protos::{GpsDataByte, GpsQzssDecoder, GpsQzssFrame, GpsQzssSubframe};
use log::trace;

use crate::error::NavError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const GPS_WORDS_PER_SUBFRAME: usize = 10;

const D30_STAR: u32 = 1 << 30;
/// D1..D24 in the word
const DATA_BITS_MASK: u32 = 0x3fff_ffc0;
const HOW_SUBFRAME_ID_SHIFT: u32 = 8;
const HOW_SUBFRAME_ID_MASK: u32 = 0x7;

/// Undoes the D30* inversion of the data bits
fn source_polarity(word: u32) -> u32 {
    if word & D30_STAR != 0 {
        word ^ DATA_BITS_MASK
    } else {
        word
    }
}

/// Subframe ID of the hand over word, second word of every subframe
pub fn subframe_id(words: &[u32; GPS_WORDS_PER_SUBFRAME]) -> u8 {
    ((source_polarity(words[1]) >> HOW_SUBFRAME_ID_SHIFT) & HOW_SUBFRAME_ID_MASK) as u8
}

fn gps_decoding(words: &[u32; GPS_WORDS_PER_SUBFRAME]) -> Option<GpsQzssFrame> {
    // the receiver only forwards subframes that passed its own parity check
    let mut decoder = GpsQzssDecoder::default().without_parity_verification();

    for word in words {
        let bytes = source_polarity(*word).to_be_bytes();

        let gps_bytes = [
            GpsDataByte::MsbPadded(bytes[0]),
            GpsDataByte::Byte(bytes[1]),
            GpsDataByte::Byte(bytes[2]),
            GpsDataByte::Byte(bytes[3]),
        ];

        for gps_byte in gps_bytes {
            if let Some(decoded) = decoder.parse(gps_byte) {
                return Some(decoded);
            }
        }
    }

    None
}

/// Subframe 1: clock correction and satellite health
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subframe1 {
    /// 10-bit week counter, no rollover compensation
    pub week: u16,
    /// 6-bit health, 0 is healthy
    pub health: u8,
    /// 10-bit issue of data, clock
    pub iodc: u16,
    pub toc_s: u32,
    pub af2_s_s2: f64,
    pub af1_s_s: f64,
    pub af0_s: f64,
}

impl Subframe1 {
    /// The IODC byte compared against IODE
    pub fn iodc_lsb(&self) -> u8 {
        (self.iodc & 0xff) as u8
    }
}

/// Subframe 2: first half of the ephemeris
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subframe2 {
    pub iode: u8,
    pub crs: f64,
    /// Mean motion difference in semicircles/s
    pub dn: f64,
    /// Mean anomaly in semicircles
    pub m0: f64,
    pub cuc: f64,
    pub e: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe_s: u32,
    pub fit_int_flag: bool,
}

/// Subframe 3: second half of the ephemeris
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subframe3 {
    pub cic: f64,
    /// Longitude of the ascending node in semicircles
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub iode: u8,
    pub idot: f64,
}

/// One decoded clock or ephemeris subframe
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Subframe {
    Eph1(Subframe1),
    Eph2(Subframe2),
    Eph3(Subframe3),
}

impl Subframe {
    /// Decodes subframes 1 to 3 from ten raw words; almanac subframes are
    /// [`NavError::UnsupportedSubframe`]
    pub fn decode(words: &[u32; GPS_WORDS_PER_SUBFRAME]) -> Result<Self, NavError> {
        let id = subframe_id(words);
        if !(1..=3).contains(&id) {
            return Err(NavError::UnsupportedSubframe(id));
        }

        let frame = gps_decoding(words).ok_or(NavError::Undecodable(id))?;
        trace!("GPS subframe {} decoded: {:?}", id, frame);

        match frame.subframe {
            GpsQzssSubframe::Ephemeris1(sf) => Ok(Self::Eph1(Subframe1 {
                week: sf.week as u16,
                health: sf.health as u8,
                iodc: sf.iodc as u16,
                toc_s: sf.toc as u32,
                af2_s_s2: sf.af2,
                af1_s_s: sf.af1,
                af0_s: sf.af0,
            })),
            GpsQzssSubframe::Ephemeris2(sf) => Ok(Self::Eph2(Subframe2 {
                iode: sf.iode as u8,
                crs: sf.crs,
                dn: sf.dn,
                m0: sf.m0,
                cuc: sf.cuc,
                e: sf.e,
                cus: sf.cus,
                sqrt_a: sf.sqrt_a,
                toe_s: sf.toe as u32,
                fit_int_flag: sf.fit_int_flag,
            })),
            GpsQzssSubframe::Ephemeris3(sf) => Ok(Self::Eph3(Subframe3 {
                cic: sf.cic,
                omega0: sf.omega0,
                cis: sf.cis,
                i0: sf.i0,
                crc: sf.crc,
                omega: sf.omega,
                omega_dot: sf.omega_dot,
                iode: sf.iode as u8,
                idot: sf.idot,
            })),
            #[allow(unreachable_patterns)]
            _ => Err(NavError::UnsupportedSubframe(id)),
        }
    }

    /// Subframe number, 1 to 3
    pub fn id(&self) -> u8 {
        match self {
            Self::Eph1(_) => 1,
            Self::Eph2(_) => 2,
            Self::Eph3(_) => 3,
        }
    }
}
