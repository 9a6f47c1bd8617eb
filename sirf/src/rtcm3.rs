//! RTCM 3 message 1002, GPS L1 observations, and its transport framing.
//!
//! Frame: `0xD3`, 6 reserved zero bits and a 10-bit payload length, the
//! payload, then CRC-24Q over everything before it.

use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    bits::{BitReader, BitWriter},
    checksum::crc24q,
    constants::{
        LIGHT_MS, RTCM_CRC_SIZE, RTCM_HEADER_SIZE, RTCM_LENGTH_MASK, RTCM_MAX_PAYLOAD_LEN,
        RTCM_SYNC_CHAR,
    },
    error::{BitError, CodecError, Rtcm3Error},
};

pub const MSG_1002: u16 = 1002;

const HEADER_BITS: usize = 64;
const SATELLITE_BITS: usize = 74;
/// Largest count the 5-bit field can carry
pub const MAX_SATELLITES: usize = 31;

/// Pseudorange resolution in meters
const PSEUDORANGE_LSB: f64 = 0.02;
/// Phaserange minus pseudorange resolution in meters
const PHASE_RANGE_LSB: f64 = 0.0005;
/// CNR resolution in dB-Hz
const CNR_LSB: f64 = 0.25;
/// Marks the phaserange difference as unusable
pub const INVALID_PHASE_RANGE: i32 = -0x80000;
const PHASE_RANGE_MAX: i32 = 0x7ffff;
const PSEUDORANGE_MAX: u32 = 0xff_ffff;

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Msg1002Header {
    pub station_id: u16,
    /// GPS time of week in milliseconds
    pub tow_ms: u32,
    /// More messages follow for the same epoch
    pub synchronous: bool,
    pub smoothing: bool,
    pub smoothing_interval: u8,
}

/// One satellite record in wire units
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Msg1002Satellite {
    pub satellite_id: u8,
    /// P code instead of C/A
    pub code_indicator: bool,
    /// Pseudorange modulo one light millisecond, 0.02 m
    pub pseudorange: u32,
    /// Phaserange minus pseudorange, 0.0005 m
    pub phase_range_diff: i32,
    pub lock_time: u8,
    /// Whole light milliseconds removed from the pseudorange
    pub ambiguity: u8,
    /// 0.25 dB-Hz, zero when not computed
    pub cnr: u8,
}

impl Msg1002Satellite {
    /// Builds a record from a pseudorange and an optional carrier phase in
    /// meters and a C/N0 in dB-Hz
    pub fn from_measurement(
        satellite_id: u8,
        pseudorange_m: f64,
        carrier_phase_m: Option<f64>,
        cno_dbhz: f64,
    ) -> Self {
        use num_traits::clamp;

        let ambiguity = clamp((pseudorange_m / LIGHT_MS).floor(), 0.0, f64::from(u8::MAX));
        let modulo = pseudorange_m - ambiguity * LIGHT_MS;
        let pseudorange = clamp(
            (modulo / PSEUDORANGE_LSB).round(),
            0.0,
            f64::from(PSEUDORANGE_MAX),
        ) as u32;

        let phase_range_diff = carrier_phase_m
            .map(|phase| ((phase - pseudorange_m) / PHASE_RANGE_LSB).round())
            .filter(|diff| diff.abs() <= f64::from(PHASE_RANGE_MAX))
            .map_or(INVALID_PHASE_RANGE, |diff| diff as i32);

        let cnr = clamp((cno_dbhz / CNR_LSB).round(), 0.0, f64::from(u8::MAX)) as u8;

        Self {
            satellite_id,
            code_indicator: false,
            pseudorange,
            phase_range_diff,
            lock_time: 0,
            ambiguity: ambiguity as u8,
            cnr,
        }
    }

    /// Full pseudorange in meters, ambiguity included
    pub fn pseudorange_m(&self) -> f64 {
        f64::from(self.ambiguity) * LIGHT_MS + f64::from(self.pseudorange) * PSEUDORANGE_LSB
    }

    /// Carrier phase in meters, `None` when flagged invalid
    pub fn carrier_phase_m(&self) -> Option<f64> {
        (self.phase_range_diff != INVALID_PHASE_RANGE)
            .then(|| self.pseudorange_m() + f64::from(self.phase_range_diff) * PHASE_RANGE_LSB)
    }

    pub fn cnr_dbhz(&self) -> f64 {
        f64::from(self.cnr) * CNR_LSB
    }

    fn write(&self, w: &mut BitWriter<'_>) -> Result<(), BitError> {
        w.write_u64(u64::from(self.satellite_id), 6)?;
        w.write_bool(self.code_indicator)?;
        w.write_u64(u64::from(self.pseudorange), 24)?;
        w.write_i64(i64::from(self.phase_range_diff), 20)?;
        w.write_u64(u64::from(self.lock_time), 7)?;
        w.write_u64(u64::from(self.ambiguity), 8)?;
        w.write_u64(u64::from(self.cnr), 8)
    }

    fn read(r: &mut BitReader<'_>) -> Result<Self, BitError> {
        Ok(Self {
            satellite_id: r.read_u64(6)? as u8,
            code_indicator: r.read_bool()?,
            pseudorange: r.read_u64(24)? as u32,
            phase_range_diff: r.read_i64(20)? as i32,
            lock_time: r.read_u64(7)? as u8,
            ambiguity: r.read_u64(8)? as u8,
            cnr: r.read_u64(8)? as u8,
        })
    }
}

/// GPS L1-only RTK observables
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Msg1002 {
    pub header: Msg1002Header,
    pub satellites: Vec<Msg1002Satellite>,
}

impl Msg1002 {
    pub fn payload_len(&self) -> usize {
        (HEADER_BITS + SATELLITE_BITS * self.satellites.len()).div_ceil(8)
    }

    /// Bit packed payload, without framing
    pub fn encode(&self) -> Result<Vec<u8>, BitError> {
        let count = self.satellites.len();
        if count > MAX_SATELLITES {
            return Err(BitError::Overflow {
                value: count as i64,
                bits: 5,
            });
        }
        let mut out = vec![0u8; self.payload_len()];
        let mut w = BitWriter::new(&mut out);
        let h = &self.header;
        w.write_u64(u64::from(MSG_1002), 12)?;
        w.write_u64(u64::from(h.station_id), 12)?;
        w.write_u64(u64::from(h.tow_ms), 30)?;
        w.write_bool(h.synchronous)?;
        w.write_u64(count as u64, 5)?;
        w.write_bool(h.smoothing)?;
        w.write_u64(u64::from(h.smoothing_interval), 3)?;
        for sat in &self.satellites {
            sat.write(&mut w)?;
        }
        let written = w.byte_len();
        debug_assert_eq!(written, out.len());
        Ok(out)
    }

    pub fn decode(payload: &[u8]) -> Result<Self, Rtcm3Error> {
        let mut r = BitReader::new(payload);
        let number = r.read_u64(12)? as u16;
        if number != MSG_1002 {
            return Err(Rtcm3Error::MessageNumber(number));
        }
        let station_id = r.read_u64(12)? as u16;
        let tow_ms = r.read_u64(30)? as u32;
        let synchronous = r.read_bool()?;
        let count = r.read_u64(5)? as usize;
        let header = Msg1002Header {
            station_id,
            tow_ms,
            synchronous,
            smoothing: r.read_bool()?,
            smoothing_interval: r.read_u64(3)? as u8,
        };
        let satellites = (0..count)
            .map(|_| Msg1002Satellite::read(&mut r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { header, satellites })
    }
}

/// Wraps `payload` in the RTCM3 transport layer
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() > RTCM_MAX_PAYLOAD_LEN {
        return Err(CodecError::Length {
            packet: "RTCM3",
            expect: payload.len(),
            got: RTCM_MAX_PAYLOAD_LEN,
        });
    }
    let len = payload.len() as u16;
    let mut out = Vec::with_capacity(RTCM_HEADER_SIZE + payload.len() + RTCM_CRC_SIZE);
    out.push(RTCM_SYNC_CHAR);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    let crc = crc24q(&out);
    out.extend_from_slice(&crc.to_be_bytes()[1..]);
    trace!("RTCM3 frame, {} payload bytes, crc {:06x}", payload.len(), crc);
    Ok(out)
}

/// Verifies length and CRC of the frame at the start of `frame` and
/// returns its payload
pub fn decode_frame(frame: &[u8]) -> Result<&[u8], Rtcm3Error> {
    let min = RTCM_HEADER_SIZE + RTCM_CRC_SIZE;
    if frame.len() < min {
        return Err(Rtcm3Error::Truncated {
            expect: min,
            got: frame.len(),
        });
    }
    if frame[0] != RTCM_SYNC_CHAR {
        return Err(Rtcm3Error::Preamble);
    }
    let len = usize::from(u16::from_be_bytes([frame[1], frame[2]]) & RTCM_LENGTH_MASK);
    let end = RTCM_HEADER_SIZE + len;
    if frame.len() < end + RTCM_CRC_SIZE {
        return Err(Rtcm3Error::Truncated {
            expect: end + RTCM_CRC_SIZE,
            got: frame.len(),
        });
    }
    let [c0, c1, c2] = [frame[end], frame[end + 1], frame[end + 2]];
    let expect = u32::from_be_bytes([0, c0, c1, c2]);
    let got = crc24q(&frame[..end]);
    if expect != got {
        return Err(Rtcm3Error::InvalidCrc { expect, got });
    }
    Ok(&frame[RTCM_HEADER_SIZE..end])
}

/// Frame decoding attempt by `rtcm_rs`, from the start of `frame`
#[cfg(feature = "rtcm")]
#[cfg_attr(docsrs, doc(cfg(feature = "rtcm")))]
pub fn interpret(frame: &[u8]) -> Option<rtcm_rs::MessageFrame<'_>> {
    let (_, msg_frame) = rtcm_rs::next_msg_frame(frame);
    msg_frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Msg1002 {
        Msg1002 {
            header: Msg1002Header {
                tow_ms: 345_600_000,
                ..Default::default()
            },
            satellites: vec![
                Msg1002Satellite::from_measurement(5, 21_000_123.456, Some(21_000_124.0), 44.0),
                Msg1002Satellite::from_measurement(32, 24_500_000.02, None, 38.3),
            ],
        }
    }

    #[test]
    fn test_satellite_scaling() {
        let sat = Msg1002Satellite::from_measurement(5, 21_000_123.456, Some(21_000_124.0), 44.0);
        // 21_000_123.456 m = 70 light ms + 14_651.396 m
        assert_eq!(sat.ambiguity, 70);
        assert_eq!(sat.pseudorange, 732_570);
        assert_eq!(sat.phase_range_diff, 1088);
        assert_eq!(sat.cnr, 176);
        assert!((sat.pseudorange_m() - 21_000_123.456).abs() < 0.01);
        assert!((sat.carrier_phase_m().unwrap() - 21_000_124.0).abs() < 0.011);
        assert_eq!(sat.cnr_dbhz(), 44.0);
    }

    #[test]
    fn test_phase_out_of_range() {
        let sat = Msg1002Satellite::from_measurement(1, 20_000_000.0, Some(20_000_300.0), 40.0);
        assert_eq!(sat.phase_range_diff, INVALID_PHASE_RANGE);
        assert_eq!(sat.carrier_phase_m(), None);
        let sat = Msg1002Satellite::from_measurement(1, 20_000_000.0, None, 40.0);
        assert_eq!(sat.carrier_phase_m(), None);
    }

    #[test]
    fn test_payload_layout() {
        let msg = sample();
        let payload = msg.encode().unwrap();
        // 64 + 2 * 74 bits
        assert_eq!(payload.len(), 27);
        // 1002 = 0x3ea in the first 12 bits, station 0 next
        assert_eq!(&payload[..3], [0x3e, 0xa0, 0x00]);
        assert_eq!(Msg1002::decode(&payload).unwrap(), msg);
    }

    #[test]
    fn test_frame_crc_and_length() {
        let payload = sample().encode().unwrap();
        let framed = frame(&payload).unwrap();
        assert_eq!(framed[0], RTCM_SYNC_CHAR);
        assert_eq!(
            usize::from(u16::from_be_bytes([framed[1], framed[2]])),
            payload.len()
        );
        let n = framed.len();
        assert_eq!(
            crc24q(&framed[..n - 3]).to_be_bytes()[1..],
            framed[n - 3..]
        );
        assert_eq!(decode_frame(&framed).unwrap(), &payload[..]);

        let mut corrupted = framed.clone();
        corrupted[5] ^= 0x01;
        assert!(matches!(
            decode_frame(&corrupted),
            Err(Rtcm3Error::InvalidCrc { .. })
        ));
        assert_eq!(
            decode_frame(&framed[..n - 1]),
            Err(Rtcm3Error::Truncated {
                expect: n,
                got: n - 1
            })
        );
    }

    #[test]
    fn test_frame_too_long() {
        assert_eq!(
            frame(&[0; 1024]),
            Err(CodecError::Length {
                packet: "RTCM3",
                expect: 1024,
                got: 1023
            })
        );
        assert_eq!(frame(&[0; 1023]).unwrap().len(), 1029);
    }

    #[test]
    fn test_too_many_satellites() {
        let msg = Msg1002 {
            satellites: vec![Msg1002Satellite::default(); 32],
            ..Default::default()
        };
        assert_eq!(
            msg.encode(),
            Err(BitError::Overflow { value: 32, bits: 5 })
        );
    }

    #[test]
    fn test_wrong_message_number() {
        let mut payload = sample().encode().unwrap();
        payload[0] = 0x3e;
        payload[1] = 0xb0; // 1003
        assert_eq!(
            Msg1002::decode(&payload),
            Err(Rtcm3Error::MessageNumber(1003))
        );
    }
}
