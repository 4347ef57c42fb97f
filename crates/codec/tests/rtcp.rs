use bytes::BytesMut;
use rtp_codec::{
    Error,
    report_block::ReportBlock,
    rtcp::{App, Bye, Packet, ReceiverReport, Sdes, SdesChunk, SdesItem, SenderReport, decode_compound},
};

#[test]
fn test_compound_sr_sdes() -> anyhow::Result<()> {
    let mut bytes = BytesMut::new();

    SenderReport {
        ssrc: 0xaaaa_bbbb,
        ntp_seconds: 3_900_000_000,
        ntp_fraction: 0,
        rtp_timestamp: 160_000,
        packet_count: 500,
        octet_count: 80_000,
        reports: vec![ReportBlock {
            ssrc: 0xcccc_dddd,
            fraction_lost: 12,
            cumulative_lost: -3,
            extended_highest_sequence: (1 << 16) | 42,
            jitter: 30,
            last_sr: 0,
            delay_since_last_sr: 0,
        }],
    }
    .encode(&mut bytes);

    let sr_end = bytes.len();
    assert_eq!(sr_end % 4, 0);

    Sdes {
        chunks: vec![SdesChunk {
            source: 0xaaaa_bbbb,
            items: vec![SdesItem::Cname("alice@example.org".into())],
        }],
    }
    .encode(&mut bytes);

    let packets = decode_compound(&bytes)?;
    assert_eq!(packets.len(), 2);

    match &packets[0] {
        Packet::SenderReport(sr) => {
            assert_eq!(sr.ssrc, 0xaaaa_bbbb);
            assert_eq!(sr.reports[0].cumulative_lost, -3);
        }
        other => panic!("expected sender report, got {other:?}"),
    }

    match &packets[1] {
        Packet::SourceDescription(sdes) => {
            assert_eq!(sdes.chunks[0].items[0], SdesItem::Cname("alice@example.org".into()));
        }
        other => panic!("expected sdes, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_compound_requires_sr_or_rr_first() -> anyhow::Result<()> {
    let mut bytes = BytesMut::new();
    Bye {
        sources: vec![1],
        reason: None,
    }
    .encode(&mut bytes)?;

    assert_eq!(decode_compound(&bytes), Err(Error::MalformedCompound));
    Ok(())
}

#[test]
fn test_compound_rejects_truncated_last_packet() -> anyhow::Result<()> {
    let mut bytes = BytesMut::new();
    ReceiverReport {
        ssrc: 1,
        reports: Vec::new(),
    }
    .encode(&mut bytes);

    bytes.truncate(bytes.len() - 1);
    assert!(decode_compound(&bytes).is_err());
    Ok(())
}

#[test]
fn test_bye_with_reason_round_trips() -> anyhow::Result<()> {
    let mut bytes = BytesMut::new();
    let bye = Bye {
        sources: vec![1, 2, 3],
        reason: Some("done".into()),
    };

    bye.clone().encode(&mut bytes)?;
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(Bye::decode(&bytes)?, bye);

    Ok(())
}

#[test]
fn test_app_round_trips() -> anyhow::Result<()> {
    let mut bytes = BytesMut::new();
    let app = App {
        subtype: 3,
        source: 99,
        name: *b"EXAM",
        data: &[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 1],
    };

    app.clone().encode(&mut bytes)?;
    assert_eq!(App::decode(&bytes)?, app);

    Ok(())
}
