//! AI3 aiding messages exchanged between a location client and an
//! assistance server.
//!
//! Responses travel client to server (MIDs below 0x80), requests and aiding
//! data server to client. Most MIDs are composite and carry a sub-ID.

use sirf_derive::{define_packets, sirf_packet, sirf_record};

use crate::{
    bits::{WireField, WireReader, WireWriter, I24},
    codec::{decode_exact, MessageId, Protocol, SirfPacket},
    error::CodecError,
};

pub(crate) const PROTOCOL: Protocol = Protocol::Ai3;

/// Degrees per LSB of a 32-bit semicircle latitude
const LAT_LSB: f64 = 180.0 / 4_294_967_296.0;

#[sirf_packet]
#[sirf(mid = 0x45, sid = 0x01, fixed_len = 27)]
pub struct PositionResponse {
    pub pos_req_id: u8,
    pub pos_results_flag: u8,
    pub pos_error_status: u8,
    pub qos_pass_flag: u8,
    pub pos_type: u8,
    pub dgps_cor: u8,
    pub meas_gps_week: u16,
    /// Milliseconds of the week
    #[sirf(scale = 1e-3, alias = meas_gps_seconds_f64)]
    pub meas_gps_seconds: u32,
    /// 180 / 2^32 degrees
    #[sirf(scale = 4.190_951_585_769_653e-8, alias = lat_degrees)]
    pub lat: i32,
    /// 360 / 2^32 degrees
    #[sirf(scale = 8.381_903_171_539_307e-8, alias = lon_degrees)]
    pub lon: i32,
    pub other_sections: u8,
    pub hor_err_angle: u8,
    pub hor_err_major: u8,
    pub hor_err_minor: u8,
    pub vert_pos_height: u16,
    pub vert_pos_std: u8,
}

#[sirf_record]
pub struct MeasuredSatellite {
    pub sv_prn: u8,
    pub c_n0: u8,
    /// Doppler in 0.2 Hz
    #[sirf(scale = 0.2, alias = doppler_hz)]
    pub doppler: i16,
    /// Whole chips of the code phase
    pub sv_code_phase_wh: u8,
    /// Fractional chips in 1/2^10
    pub sv_code_phase_fr: u16,
    pub multipath_indicator: u8,
    pub pseudorange_rms_error: u8,
    pub reserved: u8,
}

/// Raw code phase measurements returned to a server computing the fix
#[sirf_packet]
#[sirf(mid = 0x45, sid = 0x02, fixed_len = 11)]
pub struct MeasurementResponse {
    pub pos_req_id: u8,
    pub gps_meas_flag: u8,
    pub meas_error_status: u8,
    pub meas_gps_week: u16,
    pub meas_gps_seconds: u32,
    pub time_accuracy: u8,
    pub num_sv: u8,
    #[sirf(count = num_sv)]
    pub satellites: Vec<MeasuredSatellite>,
}

#[sirf_record]
pub struct EphemerisState {
    pub sv_prn: u8,
    pub gps_week: u16,
    /// Ephemeris reference time in 16 s
    pub toe: u16,
    pub iode: u8,
    #[sirf(scale = 1.406_25, alias = azimuth_degrees)]
    pub azimuth: u8,
    #[sirf(scale = 0.703_125, alias = elevation_degrees)]
    pub elevation: i8,
}

/// Ephemeris ages held by the client, so the server sends only what is stale
#[sirf_packet]
#[sirf(mid = 0x46, sid = 0x01, fixed_len = 2)]
pub struct EphemerisStatusResponse {
    pub status: u8,
    pub num_sv: u8,
    #[sirf(count = num_sv)]
    pub satellites: Vec<EphemerisState>,
}

#[sirf_packet]
#[sirf(mid = 0x47, fixed_len = 0)]
pub struct HardwareConfigRequest {}

#[sirf_packet]
#[sirf(mid = 0x49, sid = 0x01, fixed_len = 0)]
pub struct ApproxPositionRequest {}

#[sirf_packet]
#[sirf(mid = 0x49, sid = 0x02, fixed_len = 0)]
pub struct TimeTransferRequest {}

#[sirf_packet]
#[sirf(mid = 0x49, sid = 0x03, fixed_len = 1)]
pub struct FrequencyTransferRequest {
    pub request_flags: u8,
}

#[sirf_packet]
#[sirf(mid = 0x4a, sid = 0x01, fixed_len = 1)]
pub struct SessionOpeningNotification {
    pub ses_open_not: u8,
}

#[sirf_packet]
#[sirf(mid = 0x4a, sid = 0x02, fixed_len = 1)]
pub struct SessionClosingNotification {
    pub ses_close_not: u8,
}

/// Client side acknowledgement of a server message
#[sirf_packet]
#[sirf(mid = 0x4b, sid = 0x01, fixed_len = 4)]
pub struct AckNack {
    pub ack_nack_mid: u8,
    pub ack_nack_sid: u8,
    /// Zero acknowledges, anything else rejects
    pub ack_nack: u8,
    pub ack_nack_reason: u8,
}

#[sirf_packet]
#[sirf(mid = 0xd2, fixed_len = 8)]
pub struct PositionRequest {
    pub pos_req_id: u8,
    pub num_fixes: u8,
    pub time_btw_fixes: u8,
    pub hori_error_max: u8,
    pub vert_error_max: u8,
    pub resp_time_max: u8,
    pub time_acc_priority: u8,
    pub location_method: u8,
}

/// Broadcast ephemeris of one satellite in its subframe scaling
#[sirf_record]
pub struct Ai3Ephemeris {
    pub eph_flag: u8,
    pub sv_prn: u8,
    pub ura_ind: u8,
    pub iode: u8,
    pub c_rs: i16,
    pub delta_n: i16,
    pub m0: i32,
    pub c_uc: i16,
    pub eccentricity: u32,
    pub c_us: i16,
    pub a_sqrt: u32,
    pub toe: u16,
    pub c_ic: i16,
    pub omega_0: i32,
    pub c_is: i16,
    pub angle_inclination: i32,
    pub c_rc: i16,
    pub omega: i32,
    pub omegadot: I24,
    pub idot: i16,
    pub toc: u16,
    pub af2: i8,
    pub af1: i16,
    pub af0: I24,
}

#[sirf_packet]
#[sirf(mid = 0xd3, sid = 0x01, fixed_len = 1)]
pub struct SetEphemeris {
    pub num_sv: u8,
    #[sirf(count = num_sv)]
    pub ephemerides: Vec<Ai3Ephemeris>,
}

/// Klobuchar ionospheric model parameters
#[sirf_packet]
#[sirf(mid = 0xd3, sid = 0x03, fixed_len = 8)]
pub struct SetIono {
    pub alpha: [i8; 4],
    pub beta: [i8; 4],
}

#[sirf_packet]
#[sirf(mid = 0xd4, sid = 0x01, fixed_len = 5)]
pub struct EphemerisStatusRequest {
    pub eph_status_type: u8,
    /// Bit N selects PRN N+1
    pub sv_mask: u32,
}

#[sirf_packet]
#[sirf(mid = 0xd5, sid = 0x01, fixed_len = 1)]
pub struct SessionOpeningRequest {
    pub ses_open_req: u8,
}

#[sirf_packet]
#[sirf(mid = 0xd5, sid = 0x02, fixed_len = 1)]
pub struct SessionClosingRequest {
    pub ses_close_req: u8,
}

#[sirf_packet]
#[sirf(mid = 0xd6, fixed_len = 7)]
pub struct HardwareConfigResponse {
    pub hw_config: u8,
    /// 40-bit nominal reference frequency in 1/1000 Hz
    pub nominal_freq: [u8; 5],
    pub nw_enhance_type: u8,
}

#[sirf_packet]
#[sirf(mid = 0xd7, sid = 0x01, fixed_len = 14)]
pub struct ApproxPositionResponse {
    #[sirf(scale = 4.190_951_585_769_653e-8, alias = lat_degrees)]
    pub lat: i32,
    #[sirf(scale = 8.381_903_171_539_307e-8, alias = lon_degrees)]
    pub lon: i32,
    /// Altitude in 0.1 m with a 500 m offset
    pub alt: u16,
    pub est_hor_err: u8,
    pub est_ver_err: u16,
    pub use_alt_aiding: u8,
}

impl ApproxPositionResponse {
    /// Builds the response from a position in degrees and meters
    pub fn from_degrees(lat: f64, lon: f64, alt_m: f64) -> Self {
        use num_traits::clamp;

        let lat = clamp((lat / LAT_LSB).round(), f64::from(i32::MIN), f64::from(i32::MAX));
        let lon = clamp(
            (lon / (2.0 * LAT_LSB)).round(),
            f64::from(i32::MIN),
            f64::from(i32::MAX),
        );
        let alt = clamp(((alt_m + 500.0) * 10.0).round(), 0.0, f64::from(u16::MAX));
        Self {
            lat: lat as i32,
            lon: lon as i32,
            alt: alt as u16,
            ..Default::default()
        }
    }

    pub fn alt_meters(&self) -> f64 {
        f64::from(self.alt) * 0.1 - 500.0
    }
}

/// Coarse or precise GPS time handed to the client
#[sirf_packet]
#[sirf(mid = 0xd7, sid = 0x02, fixed_len = 12)]
pub struct TimeTransferResponse {
    pub tt_type: u8,
    pub gps_week: u16,
    /// 40-bit time of week in microseconds
    pub gps_time: [u8; 5],
    /// GPS minus UTC in 1/4 s
    pub delta_utc: I24,
    pub time_accuracy: u8,
}

impl TimeTransferResponse {
    pub fn gps_time_us(&self) -> u64 {
        self.gps_time
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }

    /// `None` when `us` needs more than 40 bits
    pub fn set_gps_time_us(&mut self, us: u64) -> Option<()> {
        if us >> 40 != 0 {
            return None;
        }
        let bytes = us.to_be_bytes();
        self.gps_time.copy_from_slice(&bytes[3..]);
        Some(())
    }

    pub fn delta_utc_seconds(&self) -> f64 {
        f64::from(self.delta_utc) * 0.25
    }
}

#[sirf_packet]
#[sirf(mid = 0xd8, sid = 0x01, fixed_len = 4)]
pub struct HostAckNack {
    pub ack_nack_mid: u8,
    pub ack_nack_sid: u8,
    pub ack_nack: u8,
    pub ack_nack_reason: u8,
}

define_packets!(
    enum Ai3Message {
        PositionResponse,
        MeasurementResponse,
        EphemerisStatusResponse,
        HardwareConfigRequest,
        ApproxPositionRequest,
        TimeTransferRequest,
        FrequencyTransferRequest,
        SessionOpeningNotification,
        SessionClosingNotification,
        AckNack,
        PositionRequest,
        SetEphemeris,
        SetIono,
        EphemerisStatusRequest,
        SessionOpeningRequest,
        SessionClosingRequest,
        HardwareConfigResponse,
        ApproxPositionResponse,
        TimeTransferResponse,
        HostAckNack,
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_packet, encode_message, Message};

    fn round_trip(msg: Ai3Message) -> Vec<u8> {
        let msg = Message::Ai3(msg);
        let bytes = encode_message(Protocol::Ai3, &msg, 1022).unwrap();
        let (id, decoded) = decode_packet(Protocol::Ai3, &bytes).unwrap();
        assert_eq!(id, msg.message_id());
        assert_eq!(decoded, msg);
        bytes
    }

    #[test]
    fn test_fixed_lengths() {
        assert_eq!(<PositionResponse as SirfPacket>::FIXED_LEN, 27);
        assert_eq!(<Ai3Ephemeris as WireField>::WIRE_LEN, 57);
        assert_eq!(<MeasuredSatellite as WireField>::WIRE_LEN, 10);
        assert_eq!(<EphemerisState as WireField>::WIRE_LEN, 8);
    }

    #[test]
    fn test_empty_body() {
        let bytes = round_trip(ApproxPositionRequest {}.into());
        assert_eq!(bytes, [0x49, 0x01]);
        assert_eq!(
            decode_packet(Protocol::Ai3, &[0x47, 0x00]),
            Err(CodecError::Length {
                packet: "HardwareConfigRequest",
                expect: 0,
                got: 1
            })
        );
    }

    #[test]
    fn test_set_ephemeris() {
        let eph = Ai3Ephemeris {
            eph_flag: 1,
            sv_prn: 12,
            iode: 0x5a,
            m0: -123_456_789,
            omegadot: I24::new(-8_000_000).unwrap(),
            af0: I24::new(1_000).unwrap(),
            ..Default::default()
        };
        let msg = SetEphemeris {
            num_sv: 2,
            ephemerides: vec![eph.clone(), Ai3Ephemeris { sv_prn: 13, ..eph }],
        };
        let bytes = round_trip(msg.into());
        assert_eq!(bytes.len(), 2 + 1 + 2 * 57);
        assert_eq!(&bytes[..4], [0xd3, 0x01, 0x02, 0x01]);
    }

    #[test]
    fn test_measurement_count_too_large() {
        let mut bytes = vec![0x45, 0x02, 0, 0, 0, 0x08, 0x4c, 0, 0, 0, 0, 3, 1];
        bytes.extend_from_slice(&[0; 10]);
        assert!(decode_packet(Protocol::Ai3, &bytes).is_ok());
        bytes[12] = 2;
        assert_eq!(
            decode_packet(Protocol::Ai3, &bytes),
            Err(CodecError::Length {
                packet: "MeasurementResponse",
                expect: 31,
                got: 21
            })
        );
    }

    #[test]
    fn test_time_transfer() {
        let mut tt = TimeTransferResponse {
            tt_type: 1,
            gps_week: 2124,
            delta_utc: I24::new(72).unwrap(),
            ..Default::default()
        };
        assert_eq!(tt.set_gps_time_us(1 << 40), None);
        tt.set_gps_time_us(345_600_000_123).unwrap();
        assert_eq!(tt.gps_time_us(), 345_600_000_123);
        assert!((tt.delta_utc_seconds() - 18.0).abs() < 1e-12);
        round_trip(tt.into());
    }

    #[test]
    fn test_approx_position_scaling() {
        let pos = ApproxPositionResponse::from_degrees(48.8566, 2.3522, 35.0);
        assert!((pos.lat_degrees() - 48.8566).abs() < 1e-6);
        assert!((pos.lon_degrees() - 2.3522).abs() < 1e-6);
        assert!((pos.alt_meters() - 35.0).abs() < 1e-9);
        round_trip(pos.into());
    }

    #[test]
    fn test_sid_matters() {
        // 0xd5/0x03 is not a defined session request
        assert_eq!(
            decode_packet(Protocol::Ai3, &[0xd5, 0x03, 0x00]),
            Err(CodecError::UnknownId {
                id: MessageId::new(Protocol::Ai3, 0xd5, Some(0x03))
            })
        );
        let (_, msg) = decode_packet(Protocol::Ai3, &[0xd5, 0x02, 0x00]).unwrap();
        assert_eq!(msg.name(), "SessionClosingRequest");
    }
}
