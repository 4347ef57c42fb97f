use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use rtp_codec::{
    report_block::ReportBlock,
    rtcp::{ReceiverReport, decode_compound},
    rtp::RtpPacket,
};

fn bench_rtp_roundtrip(c: &mut Criterion) {
    let payload = [0u8; 160];
    let mut bytes = BytesMut::with_capacity(200);

    c.bench_function("rtp encode+decode", |b| {
        b.iter(|| {
            RtpPacket {
                padding: false,
                marker: false,
                payload_type: 0,
                sequence_number: 1,
                timestamp: 160,
                ssrc: 0x1234_5678,
                csrc: Vec::new(),
                extension: None,
                payload: &payload,
            }
            .encode(&mut bytes)
            .unwrap();

            RtpPacket::decode(&bytes).unwrap();
        })
    });
}

fn bench_rtcp_compound(c: &mut Criterion) {
    let mut bytes = BytesMut::with_capacity(256);

    c.bench_function("rtcp rr compound decode", |b| {
        b.iter(|| {
            bytes.clear();

            ReceiverReport {
                ssrc: 1,
                reports: vec![ReportBlock {
                    ssrc: 2,
                    fraction_lost: 0,
                    cumulative_lost: 0,
                    extended_highest_sequence: 1000,
                    jitter: 0,
                    last_sr: 0,
                    delay_since_last_sr: 0,
                }],
            }
            .encode(&mut bytes);

            decode_compound(&bytes).unwrap();
        })
    });
}

criterion_group!(benches, bench_rtp_roundtrip, bench_rtcp_compound);
criterion_main!(benches);
