use criterion::{criterion_group, criterion_main, Criterion};
use rand::RngExt;
use sirf::{
    codec::ssb::{
        ClockStatus, GeodeticNavigation, MeasuredTracker, NavLibMeasurement, TrackerChannel,
    },
    decode_frame, encode_frame, EpochAggregator, FrameScanner, Message, Protocol, SliceSource,
    SsbMessage,
};
use std::hint::black_box;

/// One second of receiver output: 12 raw measurements, tracker, geodetic
/// fix and clock status, with a little noise in front of every frame.
fn navigation_second(tow_s: f64, rng: &mut impl RngExt) -> Vec<u8> {
    let mut messages: Vec<SsbMessage> = (0..12u8)
        .map(|channel| {
            NavLibMeasurement {
                channel,
                svid: channel + 1,
                gps_sw_time: tow_s,
                pseudorange: 20_000_000.0 + rng.random_range(0.0..5_000_000.0),
                carrier_phase: 20_000_000.0,
                sync_flags: 0x07,
                cno: [42; 10],
                ..Default::default()
            }
            .into()
        })
        .collect();
    messages.push(
        MeasuredTracker {
            chnl_cnt: 12,
            channels: (1..=12)
                .map(|svid| TrackerChannel {
                    svid,
                    cno: [40; 10],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
        .into(),
    );
    messages.push(
        GeodeticNavigation {
            utc_year: 2024,
            utc_month: 1,
            utc_day: 1,
            sv_id_list: 0x0fff,
            ..Default::default()
        }
        .into(),
    );
    messages.push(
        ClockStatus {
            ext_gps_week: 2300,
            gps_tow: (tow_s * 100.0) as u32,
            ..Default::default()
        }
        .into(),
    );

    let mut out = Vec::new();
    for msg in messages {
        let noise = rng.random_range(0..8);
        out.extend((0..noise).map(|_| rng.random_range(0x00..0xa0u8)));
        out.extend(encode_frame(Protocol::Ssb, &Message::Ssb(msg)).unwrap());
    }
    out
}

fn decode_all(data: &[u8], chunk: usize) -> usize {
    let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::with_chunk(data, chunk));
    let mut count = 0;
    for packet in scanner.frames() {
        match packet.map(|p| decode_frame(Protocol::Ssb, &p)) {
            Ok(Ok(_)) => count += 1,
            other => panic!("No errors allowed! got: {:?}", other),
        }
    }
    count
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = rand::rng();
    let data: Vec<u8> = (0..60)
        .flat_map(|s| navigation_second(100_000.0 + f64::from(s), &mut rng))
        .collect();

    for chunk in &[16, 100, 512, 1024, 4096] {
        c.bench_function(&format!("scan_decode_{}", chunk), |b| {
            b.iter(|| assert_eq!(decode_all(black_box(&data), *chunk), 60 * 15))
        });
    }

    c.bench_function("epoch_to_rtcm3", |b| {
        let messages: Vec<SsbMessage> = {
            let mut scanner: FrameScanner<_> = FrameScanner::new(SliceSource::new(&data));
            scanner
                .frames()
                .filter_map(|p| match decode_frame(Protocol::Ssb, &p.ok()?).ok()?.1 {
                    Message::Ssb(msg) => Some(msg),
                    _ => None,
                })
                .collect()
        };
        b.iter(|| {
            let mut aggregator = EpochAggregator::default();
            let mut frames = 0;
            for msg in &messages {
                if let Ok(Some(frame)) = aggregator.on_message(black_box(msg)) {
                    frames += frame.len();
                }
            }
            frames
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
