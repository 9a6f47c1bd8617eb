//! Standard Binary messages.
//!
//! Output messages (receiver to host) use MIDs below 0x80, input messages
//! (host to receiver) MIDs from 0x80. MIDs 0x38, 0x40, 0x41 and 0xE8 carry
//! a sub-ID; 0xB4..=0xC7 are user pass-through messages.

use bitflags::bitflags;
use sirf_derive::{define_packets, sirf_packet, sirf_record};

use crate::{
    bits::{WireField, WireReader, WireWriter},
    codec::{decode_exact, MessageId, Passthrough, Protocol, SirfPacket},
    error::CodecError,
};

pub(crate) const PROTOCOL: Protocol = Protocol::Ssb;

/// ECEF position, velocity and DOP of the current solution
#[sirf_packet]
#[sirf(mid = 0x02, fixed_len = 40)]
pub struct MeasuredNavigation {
    /// ECEF X in meters
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// ECEF velocity X in 1/8 m/s
    #[sirf(scale = 0.125, alias = vx_mps)]
    pub vx: i16,
    #[sirf(scale = 0.125, alias = vy_mps)]
    pub vy: i16,
    #[sirf(scale = 0.125, alias = vz_mps)]
    pub vz: i16,
    pub mode1: u8,
    /// Horizontal dilution of precision in units of 0.2
    #[sirf(scale = 0.2, alias = hdop_value)]
    pub hdop: u8,
    pub mode2: u8,
    /// Only the 10 low bits of the week are transmitted
    pub gps_week: u16,
    /// Time of week in 1/100 s
    #[sirf(scale = 1e-2, alias = gps_tow_seconds)]
    pub gps_tow: u32,
    pub sv_count: u8,
    pub prn: [u8; 12],
}

#[sirf_record]
pub struct TrackerChannel {
    pub svid: u8,
    /// Azimuth in units of 1.5 degrees
    #[sirf(scale = 1.5, alias = azimuth_degrees)]
    pub azimuth: u8,
    /// Elevation in units of 0.5 degrees
    #[sirf(scale = 0.5, alias = elevation_degrees)]
    pub elevation: u8,
    pub state: u16,
    /// C/N0 in dB-Hz sampled every 100 ms
    pub cno: [u8; 10],
}

impl TrackerChannel {
    /// Mean C/N0 over the ten samples
    pub fn mean_cno(&self) -> f64 {
        let sum: u32 = self.cno.iter().map(|&c| u32::from(c)).sum();
        f64::from(sum) / self.cno.len() as f64
    }
}

/// Per channel tracking status
#[sirf_packet]
#[sirf(mid = 0x04, fixed_len = 7)]
pub struct MeasuredTracker {
    pub gps_week: i16,
    #[sirf(scale = 1e-2, alias = gps_tow_seconds)]
    pub gps_tow: u32,
    pub chnl_cnt: u8,
    #[sirf(count = chnl_cnt)]
    pub channels: Vec<TrackerChannel>,
}

/// Firmware identification string
#[sirf_packet]
#[sirf(mid = 0x06)]
pub struct SoftwareVersion {
    #[sirf(rest)]
    pub version: Vec<u8>,
}

impl SoftwareVersion {
    /// Version text up to the first NUL, if it is valid UTF-8
    pub fn version_str(&self) -> Option<&str> {
        let end = self
            .version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.version.len());
        core::str::from_utf8(&self.version[..end]).ok()
    }
}

/// Receiver clock solution, sent once per navigation epoch
#[sirf_packet]
#[sirf(mid = 0x07, fixed_len = 19)]
pub struct ClockStatus {
    /// Full GPS week number
    pub ext_gps_week: u16,
    #[sirf(scale = 1e-2, alias = gps_tow_seconds)]
    pub gps_tow: u32,
    pub sv_used_cnt: u8,
    /// Clock drift in Hz
    pub clk_drift: u32,
    /// Clock bias in nanoseconds
    #[sirf(scale = 1e-9, alias = clk_bias_seconds)]
    pub clk_bias: u32,
    /// Estimated GPS time in milliseconds
    pub est_gps_time: u32,
}

/// Raw 50 bps navigation data of one subframe: ten 30-bit words
#[sirf_packet]
#[sirf(mid = 0x08, fixed_len = 42)]
pub struct NavBits50Bps {
    pub channel: u8,
    pub svid: u8,
    pub words: [u32; 10],
}

#[sirf_packet]
#[sirf(mid = 0x09, fixed_len = 8)]
pub struct CpuThroughput {
    pub seg_stat_max: u16,
    pub seg_stat_lat: u16,
    pub avg_trk_time: u16,
    pub last_ms: u16,
}

#[sirf_packet]
#[sirf(mid = 0x0a, fixed_len = 4)]
pub struct ErrorId {
    pub err_id: u16,
    pub param_cnt: u16,
    #[sirf(count = param_cnt)]
    pub params: Vec<u32>,
}

#[sirf_packet]
#[sirf(mid = 0x0b, fixed_len = 1)]
pub struct CommandAck {
    /// MID of the acknowledged input message
    pub ack_mid: u8,
}

#[sirf_packet]
#[sirf(mid = 0x0c, fixed_len = 1)]
pub struct CommandNack {
    pub nack_mid: u8,
}

#[sirf_record]
pub struct VisibleSatellite {
    pub svid: u8,
    /// Degrees
    pub azimuth: i16,
    /// Degrees
    pub elevation: i16,
}

/// Satellites predicted to be above the horizon
#[sirf_packet]
#[sirf(mid = 0x0d, fixed_len = 1)]
pub struct VisibleList {
    pub visible_cnt: u8,
    #[sirf(count = visible_cnt)]
    pub satellites: Vec<VisibleSatellite>,
}

#[sirf_packet]
#[sirf(mid = 0x12, fixed_len = 1)]
pub struct OkToSend {
    pub ok_to_send: u8,
}

bitflags! {
    /// Synchronisation state of a raw measurement channel
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SyncFlags: u8 {
        /// Coherent integration of 10 ms instead of 2 ms
        const INTEGRATION_10MS = 0x01;
        const CODE_ALIGNED = 0x02;
        const BIT_ALIGNED = 0x04;
        /// Code and bit alignment; the carrier phase can be trusted
        const CARRIER_VALID = Self::CODE_ALIGNED.bits() | Self::BIT_ALIGNED.bits();
        const AUTOCORRELATION = 0x18;
    }
}

/// Raw tracker measurement of one channel
#[sirf_packet]
#[sirf(mid = 0x1c, fixed_len = 55)]
pub struct NavLibMeasurement {
    pub channel: u8,
    /// Measurement time tag in ms
    pub timetag: u32,
    pub svid: u8,
    /// GPS software time in seconds
    pub gps_sw_time: f64,
    /// Pseudorange in meters
    pub pseudorange: f64,
    /// Carrier frequency in m/s
    pub carrier_freq: f32,
    /// Carrier phase in meters
    pub carrier_phase: f64,
    /// Time in track in ms
    pub time_in_track: u16,
    pub sync_flags: u8,
    /// C/N0 in dB-Hz, one value per 100 ms
    pub cno: [u8; 10],
    pub delta_range_interval: u16,
    pub mean_delta_range_time: u16,
    pub extrapolation_time: i16,
    pub phase_error_count: u8,
    pub low_power_count: u8,
}

impl NavLibMeasurement {
    pub fn sync(&self) -> SyncFlags {
        SyncFlags::from_bits_truncate(self.sync_flags)
    }

    /// Weakest C/N0 over the sample window
    pub fn min_cno(&self) -> u8 {
        self.cno.iter().copied().min().unwrap_or(0)
    }
}

/// Satellite state computed by the navigation library
#[sirf_packet]
#[sirf(mid = 0x1e, fixed_len = 82)]
pub struct NavLibSvState {
    pub svid: u8,
    pub time: f64,
    /// ECEF position in meters
    pub pos: [f64; 3],
    /// ECEF velocity in m/s
    pub vel: [f64; 3],
    /// Clock bias in seconds
    pub clk_bias: f64,
    pub clk_drift: f32,
    pub eph_flag: u8,
    pub reserved: [f32; 2],
    /// Ionospheric delay in meters
    pub iono_delay: f32,
}

/// Geodetic fix, the source of NMEA output
#[sirf_packet]
#[sirf(mid = 0x29, fixed_len = 90)]
pub struct GeodeticNavigation {
    /// Zero when the fix is valid
    pub nav_valid: u16,
    pub nav_type: u16,
    pub ext_week: u16,
    /// Time of week in ms
    #[sirf(scale = 1e-3, alias = tow_seconds)]
    pub tow: u32,
    pub utc_year: u16,
    pub utc_month: u8,
    pub utc_day: u8,
    pub utc_hour: u8,
    pub utc_min: u8,
    /// Milliseconds of the minute
    pub utc_sec: u16,
    /// Bit N set when PRN N+1 is used in the solution
    pub sv_id_list: u32,
    #[sirf(scale = 1e-7, alias = lat_degrees)]
    pub lat: i32,
    #[sirf(scale = 1e-7, alias = lon_degrees)]
    pub lon: i32,
    /// Altitude above the ellipsoid in cm
    #[sirf(scale = 1e-2, alias = alt_ellips_meters)]
    pub alt_ellips: i32,
    /// Altitude above mean sea level in cm
    #[sirf(scale = 1e-2, alias = alt_msl_meters)]
    pub alt_msl: i32,
    pub datum: u8,
    /// Speed over ground in cm/s
    #[sirf(scale = 1e-2, alias = sog_mps)]
    pub sog: u16,
    /// Course over ground in 1/100 degree
    #[sirf(scale = 1e-2, alias = cog_degrees)]
    pub cog: u16,
    pub mag_var: i16,
    #[sirf(scale = 1e-2, alias = climb_rate_mps)]
    pub climb_rate: i16,
    pub heading_rate: i16,
    /// Estimated horizontal position error in cm
    pub ehpe: u32,
    pub evpe: u32,
    pub ete: u32,
    pub ehve: u16,
    pub clk_bias: u32,
    pub clk_bias_err: u32,
    pub clk_drift: i32,
    pub clk_drift_err: u32,
    pub distance: u32,
    pub distance_err: u16,
    pub heading_err: u16,
    pub sv_cnt: u8,
    #[sirf(scale = 0.2, alias = hdop_value)]
    pub hdop: u8,
    pub add_mode_info: u8,
}

/// Position fix kind encoded in the low bits of `nav_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixMode {
    NoFix,
    /// Kalman filter solutions with fewer than four satellites
    Degraded,
    Fix2D,
    Fix3D,
    DeadReckoning,
}

impl GeodeticNavigation {
    pub const NAV_TYPE_DGPS: u16 = 0x0080;

    pub fn is_valid(&self) -> bool {
        self.nav_valid == 0
    }

    pub fn fix_mode(&self) -> FixMode {
        match self.nav_type & 0x07 {
            0 => FixMode::NoFix,
            1..=3 => FixMode::Degraded,
            5 => FixMode::Fix2D,
            4 | 6 => FixMode::Fix3D,
            _ => FixMode::DeadReckoning,
        }
    }

    pub fn is_dgps(&self) -> bool {
        self.nav_type & Self::NAV_TYPE_DGPS != 0
    }

    /// PRNs used in the solution
    pub fn used_prns(&self) -> impl Iterator<Item = u8> + '_ {
        (0..32u8).filter(move |bit| self.sv_id_list & (1 << bit) != 0).map(|bit| bit + 1)
    }
}

/// Free-form debug text
#[sirf_packet]
#[sirf(mid = 0xff)]
pub struct DevelopmentData {
    #[sirf(rest)]
    pub text: Vec<u8>,
}

/// Extended ephemeris acknowledgement
#[sirf_packet]
#[sirf(mid = 0x38, sid = 0xff, fixed_len = 2)]
pub struct EeAck {
    pub ack_mid: u8,
    pub ack_sid: u8,
}

#[sirf_packet]
#[sirf(mid = 0x41, sid = 0xc0, fixed_len = 2)]
pub struct GpioState {
    pub gpio_state: u16,
}

/// Warm/cold/factory restart with optional initial position
#[sirf_packet]
#[sirf(mid = 0x80, fixed_len = 24)]
pub struct InitializeDataSource {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub clk_drift: i32,
    #[sirf(scale = 1e-2, alias = gps_tow_seconds)]
    pub gps_tow: u32,
    pub gps_week: u16,
    pub chnl_cnt: u8,
    pub reset_cfg: u8,
}

#[sirf_packet]
#[sirf(mid = 0x84, fixed_len = 1)]
pub struct PollSoftwareVersion {
    pub control: u8,
}

#[sirf_packet]
#[sirf(mid = 0x88, fixed_len = 13)]
pub struct ModeControl {
    pub reserved0: u16,
    pub deg_mode: u8,
    pub pos_calc_mode: u8,
    pub reserved1: u8,
    /// Fixed altitude for 2D fixes in meters
    pub alt_input: i16,
    pub alt_hold_mode: u8,
    pub alt_hold_source: u8,
    pub coast_timeout: u8,
    pub deg_timeout: u8,
    pub dr_timeout: u8,
    pub track_smoothing: u8,
}

#[sirf_packet]
#[sirf(mid = 0x90, fixed_len = 1)]
pub struct PollClockStatus {
    pub control: u8,
}

#[sirf_packet]
#[sirf(mid = 0xa6, fixed_len = 7)]
pub struct SetMessageRate {
    pub mode: u8,
    pub mid: u8,
    /// Output period in seconds, 0 disables
    pub rate: u8,
    pub reserved: [u8; 4],
}

#[sirf_packet]
#[sirf(mid = 0xe8, sid = 0x02, fixed_len = 4)]
pub struct EePollStatus {
    pub sv_mask: u32,
}

define_packets!(
    enum SsbMessage {
        _ = Passthrough,
        MeasuredNavigation,
        MeasuredTracker,
        SoftwareVersion,
        ClockStatus,
        NavBits50Bps,
        CpuThroughput,
        ErrorId,
        CommandAck,
        CommandNack,
        VisibleList,
        OkToSend,
        NavLibMeasurement,
        NavLibSvState,
        GeodeticNavigation,
        DevelopmentData,
        EeAck,
        GpioState,
        InitializeDataSource,
        PollSoftwareVersion,
        ModeControl,
        PollClockStatus,
        SetMessageRate,
        EePollStatus,
    }
);
