use bytes::{BufMut, BytesMut};

use super::{Header, PacketType};
use crate::{Error, report_block::ReportBlock};

/// A Receiver Report, per [RFC 3550 §6.4.2](https://www.rfc-editor.org/rfc/rfc3550#section-6.4.2).
/// Sent by participants that have received RTP but are not themselves
/// sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverReport {
    pub ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

impl ReceiverReport {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtcp::ReceiverReport;
    ///
    /// let rr = ReceiverReport {
    ///     ssrc: 42,
    ///     reports: Vec::new(),
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// rr.clone().encode(&mut bytes);
    ///
    /// assert_eq!(ReceiverReport::decode(&bytes).unwrap(), rr);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) {
        let length_words = 1 + (self.reports.len() * 6) as u16;
        Header::encode(false, self.reports.len() as u8, PacketType::ReceiverReport, length_words, bytes);

        bytes.put_u32(self.ssrc);
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
        if body.len() < 4 {
            return Err(Error::Truncated);
        }

        let mut reports = Vec::with_capacity(header.count as usize);
        let mut offset = 4;
        for _ in 0..header.count {
            if body.len() < offset + crate::report_block::REPORT_BLOCK_LEN {
                return Err(Error::Truncated);
            }

            reports.push(ReportBlock::decode(&body[offset..])?);
            offset += crate::report_block::REPORT_BLOCK_LEN;
        }

        Ok(Self {
            ssrc: u32::from_be_bytes(body[0..4].try_into()?),
            reports,
        })
    }
}
