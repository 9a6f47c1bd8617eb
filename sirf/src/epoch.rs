//! Aggregation of raw tracker measurements into RTCM3 1002 epochs.
//!
//! Raw measurements (MID 28) fill per channel slots, measured navigation
//! (MID 2) and clock status (MID 7) keep the epoch time. Clock status comes
//! last in every navigation cycle and closes the epoch.

use log::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    codec::ssb::{ClockStatus, MeasuredNavigation, NavLibMeasurement, SsbMessage, SyncFlags},
    constants::{SECONDS_PER_WEEK, SIRF_CHANNEL_COUNT},
    error::EpochError,
    rtcm3::{self, Msg1002, Msg1002Header, Msg1002Satellite},
};

/// Low bits of the week carried by measured navigation
const TRUNCATED_WEEK_MASK: u16 = 0x03ff;
const WEEK_ERA: u16 = TRUNCATED_WEEK_MASK + 1;

/// Full week closest to `known` whose low ten bits are `truncated`
fn merge_truncated_week(known: u16, truncated: u16) -> u16 {
    let week = (known & !TRUNCATED_WEEK_MASK) | (truncated & TRUNCATED_WEEK_MASK);
    if week < known && known - week > WEEK_ERA / 2 {
        week.saturating_add(WEEK_ERA)
    } else if week > known && week - known > WEEK_ERA / 2 && week >= WEEK_ERA {
        week - WEEK_ERA
    } else {
        week
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregatorConfig {
    /// Reference station ID written in the RTCM3 header
    pub station_id: u16,
    /// Channels further than this from the epoch time are dropped, seconds
    pub tolerance_s: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            station_id: 0,
            tolerance_s: 0.1,
        }
    }
}

/// Last sample of one receiver channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelMeasurement {
    pub svid: u8,
    pub sync: SyncFlags,
    /// Meters
    pub pseudorange: f64,
    /// Meters
    pub carrier_phase: f64,
    /// m/s
    pub carrier_freq: f32,
    /// Weakest C/N0 of the sample window, dB-Hz
    pub min_cno: u8,
    pub phase_error_count: u8,
    pub low_power_count: u8,
    /// Receiver time of week of the sample, seconds
    pub sample_time: f64,
}

impl ChannelMeasurement {
    fn from_raw(msg: &NavLibMeasurement) -> Self {
        Self {
            svid: msg.svid,
            sync: msg.sync(),
            pseudorange: msg.pseudorange,
            carrier_phase: msg.carrier_phase,
            carrier_freq: msg.carrier_freq,
            min_cno: msg.min_cno(),
            phase_error_count: msg.phase_error_count,
            low_power_count: msg.low_power_count,
            sample_time: msg.gps_sw_time,
        }
    }

    pub fn carrier_valid(&self) -> bool {
        self.sync.contains(SyncFlags::CARRIER_VALID)
    }

    fn to_rtcm(&self) -> Msg1002Satellite {
        let phase = self.carrier_valid().then_some(self.carrier_phase);
        Msg1002Satellite::from_measurement(
            self.svid,
            self.pseudorange,
            phase,
            f64::from(self.min_cno),
        )
    }
}

/// The epoch currently being filled
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Epoch {
    /// Full GPS week
    pub week: u16,
    /// Seconds of the week
    pub tow: f64,
    pub clock_bias_s: f64,
    /// Hz
    pub clock_drift: f64,
    pub channels: [Option<ChannelMeasurement>; SIRF_CHANNEL_COUNT],
}

impl Epoch {
    pub fn channel_count(&self) -> usize {
        self.channels.iter().flatten().count()
    }
}

/// Signed difference `a - b` of two times of week, folded across the week
/// boundary
fn tow_diff(a: f64, b: f64) -> f64 {
    let mut diff = a - b;
    if diff > SECONDS_PER_WEEK / 2.0 {
        diff -= SECONDS_PER_WEEK;
    } else if diff < -SECONDS_PER_WEEK / 2.0 {
        diff += SECONDS_PER_WEEK;
    }
    diff
}

/// Builds RTCM3 1002 output from the Standard Binary measurement stream
#[derive(Debug, Clone, Default)]
pub struct EpochAggregator {
    config: AggregatorConfig,
    epoch: Epoch,
}

impl EpochAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            epoch: Epoch::default(),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn epoch(&self) -> &Epoch {
        &self.epoch
    }

    /// Stores the sample in its channel slot, replacing the previous one
    pub fn on_raw_measurement(&mut self, msg: &NavLibMeasurement) -> Result<(), EpochError> {
        let slot = self
            .epoch
            .channels
            .get_mut(usize::from(msg.channel))
            .ok_or(EpochError::ChannelOutOfRange {
                channel: msg.channel,
                max: SIRF_CHANNEL_COUNT,
            })
            .inspect_err(|err| warn!("Raw measurement dropped: {}", err))?;
        trace!(
            "channel {}: SV {} at {:.3} s",
            msg.channel,
            msg.svid,
            msg.gps_sw_time
        );
        *slot = Some(ChannelMeasurement::from_raw(msg));
        Ok(())
    }

    /// Merges the truncated week with the known high bits and updates the
    /// time of week
    pub fn on_measured_navigation(&mut self, msg: &MeasuredNavigation) {
        self.epoch.week = merge_truncated_week(self.epoch.week, msg.gps_week);
        self.epoch.tow = msg.gps_tow_seconds();
    }

    /// Takes the authoritative time and clock, closes the epoch and returns
    /// the framed RTCM3 message, or `None` when no channel is aligned
    pub fn on_clock_status(&mut self, msg: &ClockStatus) -> Result<Option<Vec<u8>>, EpochError> {
        self.epoch.week = msg.ext_gps_week;
        self.epoch.tow = msg.gps_tow_seconds();
        self.epoch.clock_bias_s = msg.clk_bias_seconds();
        self.epoch.clock_drift = f64::from(msg.clk_drift);
        self.close()
    }

    /// Feeds any Standard Binary message; only the three epoch kinds matter
    pub fn on_message(&mut self, msg: &SsbMessage) -> Result<Option<Vec<u8>>, EpochError> {
        match *msg {
            SsbMessage::NavLibMeasurement(ref m) => self.on_raw_measurement(m).map(|()| None),
            SsbMessage::MeasuredNavigation(ref m) => {
                self.on_measured_navigation(m);
                Ok(None)
            },
            SsbMessage::ClockStatus(ref m) => self.on_clock_status(m),
            _ => Ok(None),
        }
    }

    fn close(&mut self) -> Result<Option<Vec<u8>>, EpochError> {
        let tow = self.epoch.tow;
        let mut valid = Vec::with_capacity(SIRF_CHANNEL_COUNT);
        for (idx, slot) in self.epoch.channels.iter_mut().enumerate() {
            let Some(ch) = slot.take() else {
                continue;
            };
            let offset = tow_diff(tow, ch.sample_time);
            if offset.abs() >= self.config.tolerance_s {
                warn!(
                    "channel {} (SV {}) misaligned by {:.3} s, dropped",
                    idx, ch.svid, offset
                );
                continue;
            }
            valid.push(ch);
        }

        let Some(first) = valid.first() else {
            debug!("epoch at {:.2} s has no aligned channel", tow);
            return Ok(None);
        };

        let mut nominal = first.sample_time - self.epoch.clock_bias_s;
        if nominal < 0.0 {
            nominal += SECONDS_PER_WEEK;
        }
        let tow_ms = ((nominal * 1000.0).round() as u64 % (SECONDS_PER_WEEK as u64 * 1000)) as u32;

        let msg = Msg1002 {
            header: Msg1002Header {
                station_id: self.config.station_id,
                tow_ms,
                ..Default::default()
            },
            satellites: valid.iter().map(ChannelMeasurement::to_rtcm).collect(),
        };
        let payload = msg.encode()?;
        let frame = rtcm3::frame(&payload)?;
        debug!(
            "epoch week {} tow {} ms closed with {} satellites",
            self.epoch.week,
            tow_ms,
            msg.satellites.len()
        );
        Ok(Some(frame))
    }
}
