use bytes::{BufMut, BytesMut};

use super::{Header, PacketType};
use crate::{Error, report_block::ReportBlock};

/// A Sender Report, per [RFC 3550 §6.4.1](https://www.rfc-editor.org/rfc/rfc3550#section-6.4.1).
/// Sent by participants that are actively transmitting RTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    pub ntp_seconds: u32,
    pub ntp_fraction: u32,
    pub rtp_timestamp: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    pub reports: Vec<ReportBlock>,
}

impl SenderReport {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::report_block::ReportBlock;
    /// use rtp_codec::rtcp::SenderReport;
    ///
    /// let sr = SenderReport {
    ///     ssrc: 0x1111_2222,
    ///     ntp_seconds: 1,
    ///     ntp_fraction: 2,
    ///     rtp_timestamp: 3,
    ///     packet_count: 4,
    ///     octet_count: 5,
    ///     reports: vec![ReportBlock {
    ///         ssrc: 9,
    ///         fraction_lost: 0,
    ///         cumulative_lost: 0,
    ///         extended_highest_sequence: 100,
    ///         jitter: 0,
    ///         last_sr: 0,
    ///         delay_since_last_sr: 0,
    ///     }],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// sr.clone().encode(&mut bytes);
    ///
    /// assert_eq!(SenderReport::decode(&bytes).unwrap(), sr);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) {
        let length_words = (6 + self.reports.len() * 6) as u16;
        Header::encode(false, self.reports.len() as u8, PacketType::SenderReport, length_words, bytes);

        bytes.put_u32(self.ssrc);
        bytes.put_u32(self.ntp_seconds);
        bytes.put_u32(self.ntp_fraction);
        bytes.put_u32(self.rtp_timestamp);
        bytes.put_u32(self.packet_count);
        bytes.put_u32(self.octet_count);

        for report in &self.reports {
            report.encode(bytes);
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let header = Header::decode(bytes)?;
        let end = header.byte_len();
        if bytes.len() < end {
            return Err(Error::Truncated);
        }

        Self::decode_body(&header, &bytes[super::HEADER_LEN..end])
    }

    pub(crate) fn decode_body(header: &Header, body: &[u8]) -> Result<Self, Error> {
        if body.len() < 24 {
            return Err(Error::Truncated);
        }

        let mut reports = Vec::with_capacity(header.count as usize);
        let mut offset = 24;
        for _ in 0..header.count {
            if body.len() < offset + crate::report_block::REPORT_BLOCK_LEN {
                return Err(Error::Truncated);
            }

            reports.push(ReportBlock::decode(&body[offset..])?);
            offset += crate::report_block::REPORT_BLOCK_LEN;
        }

        Ok(Self {
            ssrc: u32::from_be_bytes(body[0..4].try_into()?),
            ntp_seconds: u32::from_be_bytes(body[4..8].try_into()?),
            ntp_fraction: u32::from_be_bytes(body[8..12].try_into()?),
            rtp_timestamp: u32::from_be_bytes(body[12..16].try_into()?),
            packet_count: u32::from_be_bytes(body[16..20].try_into()?),
            octet_count: u32::from_be_bytes(body[20..24].try_into()?),
            reports,
        })
    }
}
