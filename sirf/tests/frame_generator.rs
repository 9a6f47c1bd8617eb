//! Proptest generators for Standard Binary frames.
//!
//! Geodetic navigation messages and pass-through messages are serialized
//! by hand, wrapped into frames with a correct checksum and buried in
//! noise, then read back through the scanner and the decoder.

use byteorder::{BigEndian, WriteBytesExt};
use proptest::prelude::*;
use sirf::{
    decode_frame, encode_frame, FrameScanner, FramingStatus, Message, Protocol, SliceSource,
    SsbMessage,
};

/// The fields of MID 41 the generator varies; everything else is zero
#[derive(Debug, Clone)]
pub struct Geodetic {
    pub nav_valid: u16,
    pub nav_type: u16,
    pub ext_week: u16,
    pub tow: u32,
    pub utc_sec: u16,
    pub sv_id_list: u32,
    pub lat: i32,
    pub lon: i32,
    pub alt_msl: i32,
    pub sog: u16,
    pub cog: u16,
    pub hdop: u8,
}

impl Geodetic {
    pub fn to_payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(91);
        p.push(0x29);
        p.write_u16::<BigEndian>(self.nav_valid).unwrap();
        p.write_u16::<BigEndian>(self.nav_type).unwrap();
        p.write_u16::<BigEndian>(self.ext_week).unwrap();
        p.write_u32::<BigEndian>(self.tow).unwrap();
        p.write_u16::<BigEndian>(2024).unwrap();
        p.extend_from_slice(&[6, 30, 23, 59]);
        p.write_u16::<BigEndian>(self.utc_sec).unwrap();
        p.write_u32::<BigEndian>(self.sv_id_list).unwrap();
        p.write_i32::<BigEndian>(self.lat).unwrap();
        p.write_i32::<BigEndian>(self.lon).unwrap();
        p.write_i32::<BigEndian>(self.alt_msl + 3_000).unwrap();
        p.write_i32::<BigEndian>(self.alt_msl).unwrap();
        p.push(21);
        p.write_u16::<BigEndian>(self.sog).unwrap();
        p.write_u16::<BigEndian>(self.cog).unwrap();
        // magnetic variation up to the clock drift error
        p.resize(p.len() + 36, 0);
        p.write_u32::<BigEndian>(0).unwrap();
        p.write_u16::<BigEndian>(0).unwrap();
        p.write_u16::<BigEndian>(0).unwrap();
        p.push(self.sv_id_list.count_ones() as u8);
        p.push(self.hdop);
        p.push(0);
        p
    }
}

fn checksum(payload: &[u8]) -> u16 {
    payload.iter().fold(0u16, |acc, &b| (acc + u16::from(b)) & 0x7fff)
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xa0, 0xa2];
    out.write_u16::<BigEndian>(payload.len() as u16).unwrap();
    out.extend_from_slice(payload);
    out.write_u16::<BigEndian>(checksum(payload)).unwrap();
    out.extend_from_slice(&[0xb0, 0xb3]);
    out
}

pub fn geodetic_strategy() -> impl Strategy<Value = Geodetic> {
    (
        (0u16..2, 0u16..8, 0u16..4096, 0u32..604_800_000),
        (0u16..60_000, any::<u32>()),
        (-900_000_000i32..=900_000_000, -1_800_000_000i32..=1_800_000_000),
        (-50_000i32..900_000, any::<u16>(), 0u16..36_000, any::<u8>()),
    )
        .prop_map(
            |(
                (nav_valid, nav_type, ext_week, tow),
                (utc_sec, sv_id_list),
                (lat, lon),
                (alt_msl, sog, cog, hdop),
            )| Geodetic {
                nav_valid,
                nav_type,
                ext_week,
                tow,
                utc_sec,
                sv_id_list,
                lat,
                lon,
                alt_msl,
                sog,
                cog,
                hdop,
            },
        )
}

/// Noise that never contains the first start byte, so it cannot fake a frame
pub fn noise_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("start byte", |&b| b != 0xa0), 0..64)
}

proptest! {
    #[test]
    fn test_scanner_with_generated_geodetic_frames(
        fixes in prop::collection::vec((geodetic_strategy(), noise_strategy()), 1..8),
        chunk in 1usize..300,
    ) {
        let mut data = Vec::new();
        for (fix, noise) in &fixes {
            data.extend_from_slice(noise);
            data.extend_from_slice(&frame(&fix.to_payload()));
        }

        let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::with_chunk(&data, chunk));
        let mut found = 0;
        for (fix, noise) in &fixes {
            let packet = scanner.scan_frame().unwrap();
            prop_assert_eq!(packet.skipped, noise.len());
            let (_, msg) = decode_frame(Protocol::Ssb, &packet).unwrap();
            let Message::Ssb(SsbMessage::GeodeticNavigation(nav)) = msg else {
                panic!("Decoder failed to decode a valid geodetic navigation frame");
            };
            prop_assert_eq!(nav.nav_valid, fix.nav_valid);
            prop_assert_eq!(nav.nav_type, fix.nav_type);
            prop_assert_eq!(nav.ext_week, fix.ext_week);
            prop_assert_eq!(nav.tow, fix.tow);
            prop_assert_eq!(nav.utc_sec, fix.utc_sec);
            prop_assert_eq!(nav.sv_id_list, fix.sv_id_list);
            prop_assert_eq!(nav.lat, fix.lat);
            prop_assert_eq!(nav.lon, fix.lon);
            prop_assert_eq!(nav.alt_msl, fix.alt_msl);
            prop_assert_eq!(nav.alt_ellips, fix.alt_msl + 3_000);
            prop_assert_eq!(nav.sog, fix.sog);
            prop_assert_eq!(nav.cog, fix.cog);
            prop_assert_eq!(nav.hdop, fix.hdop);
            prop_assert_eq!(u32::from(nav.sv_cnt), fix.sv_id_list.count_ones());
            prop_assert_eq!(nav.used_prns().count() as u32, fix.sv_id_list.count_ones());
            found += 1;
        }
        prop_assert_eq!(found, fixes.len());
        prop_assert_eq!(scanner.scan_frame(), Err(FramingStatus::NeedMoreData));
    }

    #[test]
    fn test_passthrough_frames_survive(
        mid in 0xb4u8..=0xc7,
        body in prop::collection::vec(any::<u8>(), 0..1021),
    ) {
        let mut payload = vec![mid];
        payload.extend_from_slice(&body);
        let wire = frame(&payload);

        let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::new(&wire));
        let packet = scanner.scan_frame().unwrap();
        let (id, msg) = decode_frame(Protocol::Ssb, &packet).unwrap();
        prop_assert_eq!(id.mid, mid);
        prop_assert_eq!(encode_frame(Protocol::Ssb, &msg).unwrap(), wire);
    }

    #[test]
    fn test_scanner_terminates_on_garbage(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        chunk in 1usize..512,
    ) {
        let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::with_chunk(&data, chunk));
        let mut events = 0;
        for event in scanner.frames() {
            match event {
                Ok(packet) => prop_assert!(packet.len() <= 1022),
                Err(FramingStatus::FramingError { skipped }) => prop_assert!(skipped >= 1),
                Err(e) => panic!("unexpected {:?}", e),
            }
            events += 1;
            prop_assert!(events <= data.len());
        }
        prop_assert!(scanner.buffered() <= data.len());
    }
}
