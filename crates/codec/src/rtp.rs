//! RTP data packet header, per [RFC 3550 §5.1](https://www.rfc-editor.org/rfc/rfc3550#section-5.1).

use bytes::{BufMut, BytesMut};

use crate::{EncodeError, Error, RTP_VERSION};

const FIXED_HEADER_LEN: usize = 12;
const MAX_CSRC: usize = 15;

/// The 32-bit extension header that follows the CSRC list when the
/// header's extension bit is set. Only the presence and length of the
/// extension are interpreted; its contents are opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpExtension {
    pub profile: u16,
    pub data: Vec<u8>,
}

/// A parsed RTP header together with the payload bytes that follow it.
///
/// `encode`/`decode` operate on plain fields; there is no bit-packed
/// accessor layer over a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket<'a> {
    pub padding: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension: Option<RtpExtension>,
    pub payload: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtp::RtpPacket;
    ///
    /// let packet = RtpPacket {
    ///     padding: false,
    ///     marker: true,
    ///     payload_type: 96,
    ///     sequence_number: 1000,
    ///     timestamp: 160_000,
    ///     ssrc: 0x1234_5678,
    ///     csrc: vec![0xaabb_ccdd],
    ///     extension: None,
    ///     payload: &[1, 2, 3, 4],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// packet.clone().encode(&mut bytes).unwrap();
    ///
    /// let decoded = RtpPacket::decode(&bytes).unwrap();
    /// assert_eq!(decoded, packet);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) -> Result<(), EncodeError> {
        if self.csrc.len() > MAX_CSRC {
            return Err(EncodeError::TooManyCsrcs);
        }

        let has_extension = self.extension.is_some();
        bytes.put_u8(
            (RTP_VERSION << 6) | ((self.padding as u8) << 5) | ((has_extension as u8) << 4) | self.csrc.len() as u8,
        );
        bytes.put_u8(((self.marker as u8) << 7) | (self.payload_type & 0x7f));
        bytes.put_u16(self.sequence_number);
        bytes.put_u32(self.timestamp);
        bytes.put_u32(self.ssrc);

        for csrc in &self.csrc {
            bytes.put_u32(*csrc);
        }

        if let Some(extension) = &self.extension {
            bytes.put_u16(extension.profile);
            bytes.put_u16((extension.data.len() / 4) as u16);
            bytes.extend_from_slice(&extension.data);
        }

        bytes.extend_from_slice(self.payload);
        Ok(())
    }

    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtp::RtpPacket;
    ///
    /// let packet = RtpPacket {
    ///     padding: false,
    ///     marker: false,
    ///     payload_type: 0,
    ///     sequence_number: 42,
    ///     timestamp: 3000,
    ///     ssrc: 7,
    ///     csrc: Vec::new(),
    ///     extension: None,
    ///     payload: &[0xde, 0xad, 0xbe, 0xef],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// packet.clone().encode(&mut bytes).unwrap();
    ///
    /// let decoded = RtpPacket::decode(&bytes).unwrap();
    /// assert_eq!(decoded.sequence_number, 42);
    /// assert_eq!(decoded.payload, &[0xde, 0xad, 0xbe, 0xef]);
    /// ```
    pub fn decode(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(Error::Truncated);
        }

        let version = bytes[0] >> 6;
        if version != RTP_VERSION {
            return Err(Error::UnsupportedVersion);
        }

        let padding = (bytes[0] & 0b0010_0000) != 0;
        let has_extension = (bytes[0] & 0b0001_0000) != 0;
        let csrc_count = (bytes[0] & 0b0000_1111) as usize;

        let marker = (bytes[1] & 0b1000_0000) != 0;
        let payload_type = bytes[1] & 0b0111_1111;

        let sequence_number = u16::from_be_bytes(bytes[2..4].try_into()?);
        let timestamp = u32::from_be_bytes(bytes[4..8].try_into()?);
        let ssrc = u32::from_be_bytes(bytes[8..12].try_into()?);

        let mut offset = FIXED_HEADER_LEN;
        let csrc_end = offset + csrc_count * 4;
        if bytes.len() < csrc_end {
            return Err(Error::Truncated);
        }

        let mut csrc = Vec::with_capacity(csrc_count);
        for chunk in bytes[offset..csrc_end].chunks_exact(4) {
            csrc.push(u32::from_be_bytes(chunk.try_into()?));
        }
        offset = csrc_end;

        let extension = if has_extension {
            if bytes.len() < offset + 4 {
                return Err(Error::Truncated);
            }

            let profile = u16::from_be_bytes(bytes[offset..offset + 2].try_into()?);
            let len_words = u16::from_be_bytes(bytes[offset + 2..offset + 4].try_into()?) as usize;
            offset += 4;

            let data_end = offset + len_words * 4;
            if bytes.len() < data_end {
                return Err(Error::Truncated);
            }

            let data = bytes[offset..data_end].to_vec();
            offset = data_end;
            Some(RtpExtension { profile, data })
        } else {
            None
        };

        let payload_end = if padding && !bytes.is_empty() {
            let pad_len = bytes[bytes.len() - 1] as usize;
            bytes.len().checked_sub(pad_len).ok_or(Error::Malformed)?
        } else {
            bytes.len()
        };

        if payload_end < offset {
            return Err(Error::Malformed);
        }

        Ok(Self {
            padding,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension,
            payload: &bytes[offset..payload_end],
        })
    }
}
