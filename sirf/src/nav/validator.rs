use bitflags::bitflags;
use log::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::subframe::{Subframe, Subframe1, Subframe2, Subframe3};
use crate::{codec::ssb::NavBits50Bps, constants::GPS_PRN_COUNT, error::NavError};

bitflags! {
    /// What the caller should (re-)emit after a subframe was applied
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u8 {
        /// Subframe 1 was stored
        const CLOCK = 0x01;
        /// Subframe 2 or 3 was stored
        const EPHEMERIS = 0x02;
        /// A new consistent set of subframes 1 to 3 became available
        const NAV_RECORD = 0x04;
    }
}

/// Subframe slots of one satellite. A slot is only ever occupied by data
/// consistent with the other occupied slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatelliteNavState {
    sf1: Option<Subframe1>,
    sf2: Option<Subframe2>,
    sf3: Option<Subframe3>,
}

impl SatelliteNavState {
    pub fn subframe1(&self) -> Option<&Subframe1> {
        self.sf1.as_ref()
    }

    pub fn subframe2(&self) -> Option<&Subframe2> {
        self.sf2.as_ref()
    }

    pub fn subframe3(&self) -> Option<&Subframe3> {
        self.sf3.as_ref()
    }

    /// All three subframes present and describing the same data set
    pub fn is_usable(&self) -> bool {
        match (&self.sf1, &self.sf2, &self.sf3) {
            (Some(sf1), Some(sf2), Some(sf3)) => {
                sf2.iode == sf1.iodc_lsb() && sf3.iode == sf2.iode
            },
            _ => false,
        }
    }

    fn apply(&mut self, prn: u8, subframe: Subframe) -> ChangeFlags {
        let mut flags = ChangeFlags::empty();
        match subframe {
            Subframe::Eph1(sf1) => {
                if self.sf1.as_ref().is_some_and(|cur| cur.iodc == sf1.iodc) {
                    trace!("PRN {}: duplicate subframe 1, IODC {}", prn, sf1.iodc);
                    return flags;
                }
                let iod = sf1.iodc_lsb();
                if self.sf2.as_ref().is_some_and(|sf2| sf2.iode != iod) {
                    debug!("PRN {}: IODC {} invalidates subframe 2", prn, sf1.iodc);
                    self.sf2 = None;
                }
                if self.sf3.as_ref().is_some_and(|sf3| sf3.iode != iod) {
                    debug!("PRN {}: IODC {} invalidates subframe 3", prn, sf1.iodc);
                    self.sf3 = None;
                }
                self.sf1 = Some(sf1);
                flags |= ChangeFlags::CLOCK;
            },
            Subframe::Eph2(sf2) => {
                if self.sf2.as_ref().is_some_and(|cur| cur.iode == sf2.iode) {
                    trace!("PRN {}: duplicate subframe 2, IODE {}", prn, sf2.iode);
                    return flags;
                }
                self.invalidate_against(prn, sf2.iode, 3);
                self.sf2 = Some(sf2);
                flags |= ChangeFlags::EPHEMERIS;
            },
            Subframe::Eph3(sf3) => {
                if self.sf3.as_ref().is_some_and(|cur| cur.iode == sf3.iode) {
                    trace!("PRN {}: duplicate subframe 3, IODE {}", prn, sf3.iode);
                    return flags;
                }
                self.invalidate_against(prn, sf3.iode, 2);
                self.sf3 = Some(sf3);
                flags |= ChangeFlags::EPHEMERIS;
            },
        }

        // duplicates returned early, so a usable state here is a new set
        if self.is_usable() {
            flags |= ChangeFlags::NAV_RECORD;
        }
        flags
    }

    /// Drops subframe 1 and the other ephemeris half when they disagree
    /// with a new IODE
    fn invalidate_against(&mut self, prn: u8, iode: u8, sibling: u8) {
        if self.sf1.as_ref().is_some_and(|sf1| sf1.iodc_lsb() != iode) {
            debug!("PRN {}: IODE {} invalidates subframe 1", prn, iode);
            self.sf1 = None;
        }
        let stale = match sibling {
            2 => self.sf2.as_ref().is_some_and(|sf2| sf2.iode != iode),
            _ => self.sf3.as_ref().is_some_and(|sf3| sf3.iode != iode),
        };
        if stale {
            debug!("PRN {}: IODE {} invalidates subframe {}", prn, iode, sibling);
            match sibling {
                2 => self.sf2 = None,
                _ => self.sf3 = None,
            }
        }
    }
}

/// Clock and ephemeris of one satellite from a consistent subframe set
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationRecord {
    pub prn: u8,
    pub clock: Subframe1,
    pub orbit1: Subframe2,
    pub orbit2: Subframe3,
}

impl NavigationRecord {
    pub fn iode(&self) -> u8 {
        self.orbit1.iode
    }

    pub fn toe_s(&self) -> u32 {
        self.orbit1.toe_s
    }
}

/// Per PRN subframe consistency tracking for PRNs 1 to 32
#[derive(Debug, Clone)]
pub struct NavSubframeValidator {
    states: [SatelliteNavState; GPS_PRN_COUNT],
}

impl Default for NavSubframeValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl NavSubframeValidator {
    pub fn new() -> Self {
        Self {
            states: core::array::from_fn(|_| SatelliteNavState::default()),
        }
    }

    fn index(prn: u8) -> Result<usize, NavError> {
        match usize::from(prn) {
            idx @ 1..=GPS_PRN_COUNT => Ok(idx - 1),
            _ => Err(NavError::InvalidPrn(prn)),
        }
    }

    /// Feeds one 50 bps subframe. Rejected input leaves every state untouched.
    pub fn apply(&mut self, msg: &NavBits50Bps) -> Result<ChangeFlags, NavError> {
        self.apply_words(msg.svid, &msg.words)
    }

    pub fn apply_words(&mut self, prn: u8, words: &[u32; 10]) -> Result<ChangeFlags, NavError> {
        let idx = Self::index(prn).inspect_err(|err| warn!("{}", err))?;
        let subframe = Subframe::decode(words)
            .inspect_err(|err| warn!("PRN {}: subframe rejected: {}", prn, err))?;
        Ok(self.states[idx].apply(prn, subframe))
    }

    pub fn state(&self, prn: u8) -> Option<&SatelliteNavState> {
        Self::index(prn).ok().map(|idx| &self.states[idx])
    }

    pub fn is_usable(&self, prn: u8) -> bool {
        self.state(prn).is_some_and(SatelliteNavState::is_usable)
    }

    /// The current record of `prn` if its three subframes agree
    pub fn navigation_record(&self, prn: u8) -> Option<NavigationRecord> {
        let state = self.state(prn)?;
        if !state.is_usable() {
            return None;
        }
        Some(NavigationRecord {
            prn,
            clock: state.sf1.clone()?,
            orbit1: state.sf2.clone()?,
            orbit2: state.sf3.clone()?,
        })
    }

    /// PRNs whose navigation record is usable
    pub fn usable_prns(&self) -> impl Iterator<Item = u8> + '_ {
        self.states
            .iter()
            .zip(1u8..)
            .filter(|(state, _)| state.is_usable())
            .map(|(_, prn)| prn)
    }

    pub fn reset(&mut self, prn: u8) -> Result<(), NavError> {
        let idx = Self::index(prn)?;
        self.states[idx] = SatelliteNavState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // subframes 1 to 3 of one satellite, IODC/IODE 0x49
    const EPH: [[u32; 10]; 3] = [
        [
            0x22c1_3e1b, 0x1527_c973, 0x13e4_0004, 0x104f_5d31, 0x9744_e6d7, 0x0775_5783,
            0x330c_80b5, 0x9250_42a1, 0x8000_1684, 0x312c_3033,
        ],
        [
            0x22c1_3e1b, 0x1527_ea1b, 0x127f_f165, 0x8c68_1f7c, 0x0249_3415, 0xbff8_811e,
            0x991b_8114, 0x043e_686e, 0x8334_7221, 0x9042_9f7b,
        ],
        [
            0x22c1_3e1b, 0x1528_0bdb, 0x000a_ea34, 0x033c_ffee, 0xbfe5_c9eb, 0x136f_b64e,
            0x86f4_ab2c, 0x0671_eb44, 0x3fea_f602, 0x9245_5213,
        ],
    ];

    /// Replaces `width` data bits starting at D`first`
    fn set_bits(word: u32, first: u32, width: u32, value: u32) -> u32 {
        let shift = 31 - first - width;
        let mask = ((1 << width) - 1) << shift;
        (word & !mask) | ((value << shift) & mask)
    }

    fn words(id: u32, iod: u32) -> [u32; 10] {
        match id {
            1 => {
                let mut w = EPH[0];
                w[2] = set_bits(w[2], 23, 2, iod >> 8);
                w[7] = set_bits(w[7], 1, 8, iod);
                w
            },
            2 => {
                let mut w = EPH[1];
                w[2] = set_bits(w[2], 1, 8, iod);
                w
            },
            3 => {
                let mut w = EPH[2];
                w[9] = set_bits(w[9], 1, 8, iod);
                w
            },
            _ => {
                let mut w = EPH[0];
                w[1] = set_bits(w[1], 20, 3, id);
                w
            },
        }
    }

    #[test]
    fn test_consistent_set() {
        let mut v = NavSubframeValidator::new();
        assert_eq!(v.apply_words(7, &words(1, 5)), Ok(ChangeFlags::CLOCK));
        assert_eq!(v.apply_words(7, &words(2, 5)), Ok(ChangeFlags::EPHEMERIS));
        assert!(!v.is_usable(7));
        assert_eq!(
            v.apply_words(7, &words(3, 5)),
            Ok(ChangeFlags::EPHEMERIS | ChangeFlags::NAV_RECORD)
        );
        assert!(v.is_usable(7));
        assert_eq!(v.navigation_record(7).unwrap().iode(), 5);
        assert_eq!(v.usable_prns().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let mut v = NavSubframeValidator::new();
        for id in 1..=3 {
            v.apply_words(1, &words(id, 9)).unwrap();
        }
        for id in 1..=3 {
            assert_eq!(v.apply_words(1, &words(id, 9)), Ok(ChangeFlags::empty()));
        }
        assert!(v.is_usable(1));
    }

    #[test]
    fn test_new_iodc_invalidates_ephemeris() {
        let mut v = NavSubframeValidator::new();
        for id in 1..=3 {
            v.apply_words(3, &words(id, 5)).unwrap();
        }
        assert_eq!(v.apply_words(3, &words(1, 6)), Ok(ChangeFlags::CLOCK));
        let state = v.state(3).unwrap();
        assert!(state.subframe1().is_some());
        assert!(state.subframe2().is_none());
        assert!(state.subframe3().is_none());
        assert!(v.navigation_record(3).is_none());

        v.apply_words(3, &words(2, 6)).unwrap();
        assert!(!v.is_usable(3));
        assert_eq!(
            v.apply_words(3, &words(3, 6)),
            Ok(ChangeFlags::EPHEMERIS | ChangeFlags::NAV_RECORD)
        );
        assert_eq!(v.navigation_record(3).unwrap().clock.iodc, 6);
    }

    #[test]
    fn test_iodc_high_bits_ignored_for_match() {
        let mut v = NavSubframeValidator::new();
        v.apply_words(4, &words(1, 0x105)).unwrap();
        v.apply_words(4, &words(2, 0x05)).unwrap();
        v.apply_words(4, &words(3, 0x05)).unwrap();
        assert!(v.is_usable(4));
    }

    #[test]
    fn test_new_iode_invalidates_clock_and_sibling() {
        let mut v = NavSubframeValidator::new();
        for id in 1..=3 {
            v.apply_words(9, &words(id, 5)).unwrap();
        }
        v.apply_words(9, &words(2, 6)).unwrap();
        let state = v.state(9).unwrap();
        assert!(state.subframe1().is_none());
        assert!(state.subframe3().is_none());
        assert_eq!(state.subframe2().map(|sf2| sf2.iode), Some(6));
    }

    #[test]
    fn test_rejections_leave_state() {
        let mut v = NavSubframeValidator::new();
        assert_eq!(v.apply_words(0, &words(1, 5)), Err(NavError::InvalidPrn(0)));
        assert_eq!(v.apply_words(33, &words(1, 5)), Err(NavError::InvalidPrn(33)));
        assert_eq!(
            v.apply_words(2, &words(5, 0)),
            Err(NavError::UnsupportedSubframe(5))
        );
        assert_eq!(v.state(2), Some(&SatelliteNavState::default()));
        assert!(v.state(0).is_none());
    }

    #[test]
    fn test_satellites_are_independent() {
        let mut v = NavSubframeValidator::new();
        for id in 1..=3 {
            v.apply_words(10, &words(id, 1)).unwrap();
            v.apply_words(11, &words(id, 2)).unwrap();
        }
        v.apply_words(10, &words(1, 3)).unwrap();
        assert!(!v.is_usable(10));
        assert!(v.is_usable(11));
        v.reset(11).unwrap();
        assert!(!v.is_usable(11));
    }
}
