//! NMEA 0183 output built from Standard Binary geodetic fixes.
//!
//! One fix expands into GGA, RMC, GLL, GSA and VTG sentences plus GSV
//! sentences of four satellites each, every kind switchable through
//! [`NmeaConfig`].

use core::fmt::{self, Write as _};
use std::io;

use chrono::prelude::*;
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    checksum::nmea_checksum,
    codec::ssb::{FixMode, GeodeticNavigation, MeasuredTracker},
    constants::{NMEA_CHECKSUM_CHAR, NMEA_SATS_PER_GSV, NMEA_SYNC_CHAR},
    error::NmeaError,
};

const MPS_TO_KNOTS: f64 = 3600.0 / 1852.0;
const MPS_TO_KMH: f64 = 3.6;
const GSA_PRN_SLOTS: usize = 12;

/// Comma separated sentence body; the framing and checksum are added when
/// it is displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    body: String,
}

impl Sentence {
    pub fn new(talker: &str, kind: &str) -> Self {
        let mut body = String::with_capacity(82);
        body.push_str(talker);
        body.push_str(kind);
        Self { body }
    }

    pub fn field<T: fmt::Display>(&mut self, value: T) -> &mut Self {
        // writing into a String cannot fail
        let _ = write!(self.body, ",{}", value);
        self
    }

    pub fn empty(&mut self) -> &mut Self {
        self.body.push(',');
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn checksum(&self) -> u8 {
        nmea_checksum(self.body.as_bytes())
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{:02X}\r\n",
            char::from(NMEA_SYNC_CHAR),
            self.body,
            char::from(NMEA_CHECKSUM_CHAR),
            self.checksum()
        )
    }
}

/// Angle as `(d)ddmm.mmmm` plus hemisphere letter
struct Coordinate {
    value: f64,
    degree_digits: usize,
    hemispheres: [char; 2],
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ten-thousandths of a minute, so rounding never yields 60 minutes
        let total = (self.value.abs() * 600_000.0).round() as u64;
        let degrees = total / 600_000;
        let minutes = (total % 600_000) / 10_000;
        let fraction = total % 10_000;
        let hemisphere = if self.value < 0.0 {
            self.hemispheres[1]
        } else {
            self.hemispheres[0]
        };
        write!(
            f,
            "{:0width$}{:02}.{:04},{}",
            degrees,
            minutes,
            fraction,
            hemisphere,
            width = self.degree_digits
        )
    }
}

/// Everything the sentences need from one navigation solution
#[derive(Debug, Clone, PartialEq)]
pub struct NmeaFix {
    pub time: DateTime<Utc>,
    pub valid: bool,
    pub mode: FixMode,
    pub dgps: bool,
    /// Degrees
    pub lat: f64,
    pub lon: f64,
    /// Meters above mean sea level
    pub alt_msl: f64,
    /// Ellipsoid minus mean sea level, meters
    pub geoid_separation: f64,
    pub sog_mps: f64,
    pub cog_degrees: f64,
    pub hdop: f64,
    pub used_prns: Vec<u8>,
}

impl NmeaFix {
    pub fn from_geodetic(nav: &GeodeticNavigation) -> Result<Self, NmeaError> {
        Self::try_from(nav)
    }

    fn position(&self) -> Option<(Coordinate, Coordinate)> {
        self.valid.then(|| {
            (
                Coordinate {
                    value: self.lat,
                    degree_digits: 2,
                    hemispheres: ['N', 'S'],
                },
                Coordinate {
                    value: self.lon,
                    degree_digits: 3,
                    hemispheres: ['E', 'W'],
                },
            )
        })
    }

    /// GGA quality indicator
    fn quality(&self) -> u8 {
        match (self.valid, self.mode) {
            (false, _) | (_, FixMode::NoFix) => 0,
            (true, FixMode::DeadReckoning) => 6,
            (true, _) if self.dgps => 2,
            _ => 1,
        }
    }

    /// NMEA 2.3 mode indicator
    fn mode_indicator(&self) -> char {
        match (self.valid, self.mode) {
            (false, _) | (_, FixMode::NoFix) => 'N',
            (true, FixMode::DeadReckoning) => 'E',
            (true, _) if self.dgps => 'D',
            _ => 'A',
        }
    }

    fn status(&self) -> char {
        if self.valid {
            'A'
        } else {
            'V'
        }
    }

    fn utc_time(&self) -> impl fmt::Display {
        self.time.format("%H%M%S%.3f")
    }
}

impl TryFrom<&GeodeticNavigation> for NmeaFix {
    type Error = NmeaError;

    fn try_from(nav: &GeodeticNavigation) -> Result<Self, Self::Error> {
        let date = NaiveDate::from_ymd_opt(
            i32::from(nav.utc_year),
            u32::from(nav.utc_month),
            u32::from(nav.utc_day),
        )
        .ok_or(NmeaError::InvalidDate)?;
        let time = NaiveTime::from_hms_milli_opt(
            u32::from(nav.utc_hour),
            u32::from(nav.utc_min),
            u32::from(nav.utc_sec / 1000),
            u32::from(nav.utc_sec % 1000),
        )
        .ok_or(NmeaError::InvalidDate)?;

        let mode = nav.fix_mode();
        Ok(Self {
            time: Utc.from_utc_datetime(&NaiveDateTime::new(date, time)),
            valid: nav.is_valid() && mode != FixMode::NoFix,
            mode,
            dgps: nav.is_dgps(),
            lat: nav.lat_degrees(),
            lon: nav.lon_degrees(),
            alt_msl: nav.alt_msl_meters(),
            geoid_separation: nav.alt_ellips_meters() - nav.alt_msl_meters(),
            sog_mps: nav.sog_mps(),
            cog_degrees: nav.cog_degrees(),
            hdop: nav.hdop_value(),
            used_prns: nav.used_prns().collect(),
        })
    }
}

/// Which sentences are produced, and with which talker ID
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NmeaConfig {
    pub talker: String,
    pub gga: bool,
    pub rmc: bool,
    pub gll: bool,
    pub gsa: bool,
    pub vtg: bool,
    pub gsv: bool,
}

impl Default for NmeaConfig {
    fn default() -> Self {
        Self {
            talker: String::from("GP"),
            gga: true,
            rmc: true,
            gll: true,
            gsa: true,
            vtg: true,
            gsv: true,
        }
    }
}

/// Satellite as listed in GSV
struct InView {
    prn: u8,
    elevation: f64,
    azimuth: f64,
    snr: f64,
}

pub struct NmeaWriter<W: io::Write> {
    sink: W,
    config: NmeaConfig,
}

impl<W: io::Write> NmeaWriter<W> {
    pub fn new(sink: W, config: NmeaConfig) -> Self {
        Self { sink, config }
    }

    pub fn config(&self) -> &NmeaConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn write_sentence(&mut self, sentence: &Sentence) -> Result<(), NmeaError> {
        trace!("NMEA {}", sentence.body());
        write!(self.sink, "{}", sentence)?;
        Ok(())
    }

    /// Writes every enabled sentence for `fix`; GSV needs the tracker
    /// message of the same cycle. Returns the number of sentences written.
    pub fn write_fix(
        &mut self,
        fix: &NmeaFix,
        tracker: Option<&MeasuredTracker>,
    ) -> Result<usize, NmeaError> {
        let mut sentences = Vec::new();
        if self.config.gga {
            sentences.push(self.gga(fix));
        }
        if self.config.rmc {
            sentences.push(self.rmc(fix));
        }
        if self.config.gll {
            sentences.push(self.gll(fix));
        }
        if self.config.gsa {
            sentences.push(self.gsa(fix));
        }
        if self.config.vtg {
            sentences.push(self.vtg(fix));
        }
        if self.config.gsv {
            if let Some(tracker) = tracker {
                sentences.extend(self.gsv(tracker));
            }
        }

        for sentence in &sentences {
            self.write_sentence(sentence)?;
        }
        self.sink.flush()?;
        Ok(sentences.len())
    }

    fn sentence(&self, kind: &str) -> Sentence {
        Sentence::new(&self.config.talker, kind)
    }

    fn position_fields(s: &mut Sentence, fix: &NmeaFix) {
        match fix.position() {
            Some((lat, lon)) => {
                s.field(lat).field(lon);
            },
            None => {
                s.empty().empty().empty().empty();
            },
        }
    }

    fn gga(&self, fix: &NmeaFix) -> Sentence {
        let mut s = self.sentence("GGA");
        s.field(fix.utc_time());
        Self::position_fields(&mut s, fix);
        s.field(fix.quality())
            .field(format_args!("{:02}", fix.used_prns.len()))
            .field(format_args!("{:.1}", fix.hdop));
        if fix.valid {
            s.field(format_args!("{:.1}", fix.alt_msl))
                .field('M')
                .field(format_args!("{:.1}", fix.geoid_separation))
                .field('M');
        } else {
            s.empty().field('M').empty().field('M');
        }
        // DGPS age and station ID
        s.empty().empty();
        s
    }

    fn rmc(&self, fix: &NmeaFix) -> Sentence {
        let mut s = self.sentence("RMC");
        s.field(fix.utc_time()).field(fix.status());
        Self::position_fields(&mut s, fix);
        s.field(format_args!("{:.1}", fix.sog_mps * MPS_TO_KNOTS))
            .field(format_args!("{:.1}", fix.cog_degrees))
            .field(fix.time.format("%d%m%y"))
            // magnetic variation and its direction
            .empty()
            .empty()
            .field(fix.mode_indicator());
        s
    }

    fn gll(&self, fix: &NmeaFix) -> Sentence {
        let mut s = self.sentence("GLL");
        Self::position_fields(&mut s, fix);
        s.field(fix.utc_time())
            .field(fix.status())
            .field(fix.mode_indicator());
        s
    }

    fn gsa(&self, fix: &NmeaFix) -> Sentence {
        let mut s = self.sentence("GSA");
        let dimension = match fix.mode {
            _ if !fix.valid => 1,
            FixMode::NoFix => 1,
            FixMode::Degraded | FixMode::Fix2D => 2,
            FixMode::Fix3D | FixMode::DeadReckoning => 3,
        };
        s.field('A').field(dimension);
        for slot in 0..GSA_PRN_SLOTS {
            match fix.used_prns.get(slot) {
                Some(prn) => s.field(format_args!("{:02}", prn)),
                None => s.empty(),
            };
        }
        // PDOP and VDOP are not part of the geodetic fix
        s.empty()
            .field(format_args!("{:.1}", fix.hdop))
            .empty();
        s
    }

    fn vtg(&self, fix: &NmeaFix) -> Sentence {
        let mut s = self.sentence("VTG");
        s.field(format_args!("{:.1}", fix.cog_degrees))
            .field('T')
            .empty()
            .field('M')
            .field(format_args!("{:.1}", fix.sog_mps * MPS_TO_KNOTS))
            .field('N')
            .field(format_args!("{:.1}", fix.sog_mps * MPS_TO_KMH))
            .field('K')
            .field(fix.mode_indicator());
        s
    }

    fn gsv(&self, tracker: &MeasuredTracker) -> Vec<Sentence> {
        let in_view: Vec<InView> = tracker
            .channels
            .iter()
            .filter(|ch| ch.svid != 0)
            .map(|ch| InView {
                prn: ch.svid,
                elevation: ch.elevation_degrees(),
                azimuth: ch.azimuth_degrees(),
                snr: ch.mean_cno(),
            })
            .collect();

        let total = in_view.len().div_ceil(NMEA_SATS_PER_GSV);
        in_view
            .chunks(NMEA_SATS_PER_GSV)
            .enumerate()
            .map(|(idx, chunk)| {
                let mut s = self.sentence("GSV");
                s.field(total)
                    .field(idx + 1)
                    .field(format_args!("{:02}", in_view.len()));
                for sat in chunk {
                    s.field(format_args!("{:02}", sat.prn))
                        .field(format_args!("{:02.0}", sat.elevation))
                        .field(format_args!("{:03.0}", sat.azimuth))
                        .field(format_args!("{:02.0}", sat.snr));
                }
                s
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ssb::TrackerChannel;

    fn geodetic() -> GeodeticNavigation {
        GeodeticNavigation {
            nav_valid: 0,
            nav_type: 0x0004,
            utc_year: 2024,
            utc_month: 3,
            utc_day: 9,
            utc_hour: 12,
            utc_min: 34,
            utc_sec: 56_789,
            sv_id_list: 0b1011,
            lat: 377_749_000,
            lon: -1_224_194_000,
            alt_ellips: 1_000,
            alt_msl: 3_000,
            sog: 1_000,
            cog: 9_000,
            hdop: 6,
            ..Default::default()
        }
    }

    fn tracker(count: u8) -> MeasuredTracker {
        MeasuredTracker {
            chnl_cnt: count,
            channels: (1..=count)
                .map(|svid| TrackerChannel {
                    svid,
                    azimuth: 100,
                    elevation: 60,
                    cno: [40; 10],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn verify_checksum(line: &str) {
        assert!(line.starts_with('$'));
        assert!(line.ends_with("\r\n"));
        let star = line.find('*').unwrap();
        let body = &line[1..star];
        let expect = u8::from_str_radix(&line[star + 1..star + 3], 16).unwrap();
        assert_eq!(nmea_checksum(body.as_bytes()), expect, "{}", line);
    }

    #[test]
    fn test_sentence_format() {
        let mut s = Sentence::new("GP", "GLL");
        s.field("4916.45")
            .field('N')
            .field("12311.12")
            .field('W')
            .field(225444)
            .field('A');
        assert_eq!(s.to_string(), "$GPGLL,4916.45,N,12311.12,W,225444,A*31\r\n");
    }

    #[test]
    fn test_coordinate_format() {
        let lat = Coordinate {
            value: 37.7749,
            degree_digits: 2,
            hemispheres: ['N', 'S'],
        };
        assert_eq!(lat.to_string(), "3746.4940,N");
        let lon = Coordinate {
            value: -122.4194,
            degree_digits: 3,
            hemispheres: ['E', 'W'],
        };
        assert_eq!(lon.to_string(), "12225.1640,W");
        let edge = Coordinate {
            value: 1.999_999_999,
            degree_digits: 2,
            hemispheres: ['N', 'S'],
        };
        assert_eq!(edge.to_string(), "0200.0000,N");
    }

    #[test]
    fn test_fix_from_geodetic() {
        let fix = NmeaFix::from_geodetic(&geodetic()).unwrap();
        assert!(fix.valid);
        assert_eq!(fix.mode, FixMode::Fix3D);
        assert_eq!(fix.used_prns, vec![1, 2, 4]);
        assert_eq!(fix.time.to_rfc3339(), "2024-03-09T12:34:56.789+00:00");
        assert!((fix.geoid_separation + 20.0).abs() < 1e-9);
        assert!((fix.hdop - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_date() {
        let nav = GeodeticNavigation {
            utc_month: 13,
            ..geodetic()
        };
        assert!(matches!(
            NmeaFix::from_geodetic(&nav),
            Err(NmeaError::InvalidDate)
        ));
    }

    #[test]
    fn test_write_fix() {
        let fix = NmeaFix::from_geodetic(&geodetic()).unwrap();
        let mut writer = NmeaWriter::new(Vec::new(), NmeaConfig::default());
        let count = writer.write_fix(&fix, Some(&tracker(9))).unwrap();
        // five fix sentences and three GSV chunks
        assert_eq!(count, 8);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<_> = text.split_inclusive("\r\n").collect();
        assert_eq!(lines.len(), 8);
        for line in &lines {
            verify_checksum(line);
        }
        assert!(lines[0].starts_with(
            "$GPGGA,123456.789,3746.4940,N,12225.1640,W,1,03,1.2,30.0,M,-20.0,M,,*"
        ));
        assert!(lines[1].starts_with("$GPRMC,123456.789,A,3746.4940,N,12225.1640,W,19.4,90.0,090324,,,A*"));
        assert!(lines[3].starts_with("$GPGSA,A,3,01,02,04,,,,,,,,,,,1.2,*"));
        assert!(lines[5].starts_with("$GPGSV,3,1,09,01,30,150,40,"));
        assert!(lines[7].starts_with("$GPGSV,3,3,09,09,30,150,40*"));
    }

    #[test]
    fn test_config_selects_sentences() {
        let fix = NmeaFix::from_geodetic(&GeodeticNavigation {
            nav_valid: 1,
            ..geodetic()
        })
        .unwrap();
        let config = NmeaConfig {
            talker: String::from("GN"),
            rmc: false,
            gll: false,
            gsa: false,
            vtg: false,
            ..Default::default()
        };
        let mut writer = NmeaWriter::new(Vec::new(), config);
        assert_eq!(writer.write_fix(&fix, None).unwrap(), 1);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.starts_with("$GNGGA,123456.789,,,,,0,03,1.2,,M,,M,,*"));
        verify_checksum(&text);
    }
}
