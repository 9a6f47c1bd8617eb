//! F protocol: session control between a location client and a control
//! point. Every MID stands alone, there are no sub-IDs.

use sirf_derive::{define_packets, sirf_packet, sirf_record};

use crate::{
    bits::{WireField, WireReader, WireWriter, I24},
    codec::{decode_exact, MessageId, Protocol, SirfPacket},
    error::CodecError,
};

pub(crate) const PROTOCOL: Protocol = Protocol::F;

#[sirf_packet]
#[sirf(mid = 0x01, fixed_len = 1)]
pub struct SessionOpeningNotification {
    pub ses_open_not: u8,
}

#[sirf_packet]
#[sirf(mid = 0x02, fixed_len = 1)]
pub struct SessionClosingNotification {
    pub ses_close_not: u8,
}

#[sirf_packet]
#[sirf(mid = 0x03, fixed_len = 1)]
pub struct ErrorNotification {
    pub err_reason: u8,
}

#[sirf_packet]
#[sirf(mid = 0x05, fixed_len = 0)]
pub struct ApproxPositionRequest {}

#[sirf_packet]
#[sirf(mid = 0x06, fixed_len = 0)]
pub struct TimeTransferRequest {}

#[sirf_packet]
#[sirf(mid = 0x07, fixed_len = 3)]
pub struct AckNack {
    pub ack_nack_mid: u8,
    pub ack_nack: u8,
    pub ack_nack_reason: u8,
}

/// State of the location client
#[sirf_packet]
#[sirf(mid = 0x08, fixed_len = 2)]
pub struct SlcStatus {
    pub slc_status: u8,
    pub pending_requests: u8,
}

#[sirf_packet]
#[sirf(mid = 0x81, fixed_len = 1)]
pub struct SessionOpeningRequest {
    pub ses_open_req: u8,
}

#[sirf_packet]
#[sirf(mid = 0x82, fixed_len = 1)]
pub struct SessionClosingRequest {
    pub ses_close_req: u8,
}

#[sirf_record]
pub struct MessagePriority {
    pub msg_id: u8,
    pub priority: u8,
}

/// Relative priority of the client's output messages
#[sirf_packet]
#[sirf(mid = 0x83, fixed_len = 1)]
pub struct PriorityResponse {
    pub num_entries: u8,
    #[sirf(count = num_entries)]
    pub entries: Vec<MessagePriority>,
}

impl PriorityResponse {
    pub fn priority_of(&self, msg_id: u8) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.msg_id == msg_id)
            .map(|e| e.priority)
    }
}

#[sirf_packet]
#[sirf(mid = 0x84, fixed_len = 14)]
pub struct ApproxPositionResponse {
    #[sirf(scale = 4.190_951_585_769_653e-8, alias = lat_degrees)]
    pub lat: i32,
    #[sirf(scale = 8.381_903_171_539_307e-8, alias = lon_degrees)]
    pub lon: i32,
    pub alt: u16,
    pub est_hor_err: u8,
    pub est_ver_err: u16,
    pub use_alt_aiding: u8,
}

#[sirf_packet]
#[sirf(mid = 0x85, fixed_len = 12)]
pub struct TimeTransferResponse {
    pub tt_type: u8,
    pub gps_week: u16,
    pub gps_time: [u8; 5],
    pub delta_utc: I24,
    pub time_accuracy: u8,
}

#[sirf_packet]
#[sirf(mid = 0x86, fixed_len = 3)]
pub struct HostAckNack {
    pub ack_nack_mid: u8,
    pub ack_nack: u8,
    pub ack_nack_reason: u8,
}

define_packets!(
    enum FMessage {
        SessionOpeningNotification,
        SessionClosingNotification,
        ErrorNotification,
        ApproxPositionRequest,
        TimeTransferRequest,
        AckNack,
        SlcStatus,
        SessionOpeningRequest,
        SessionClosingRequest,
        PriorityResponse,
        ApproxPositionResponse,
        TimeTransferResponse,
        HostAckNack,
    }
);
