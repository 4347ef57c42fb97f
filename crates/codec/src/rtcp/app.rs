use bytes::{BufMut, BytesMut};

use super::{Header, PacketType};
use crate::{EncodeError, Error};

/// An Application-Defined packet, per [RFC 3550 §6.7](https://www.rfc-editor.org/rfc/rfc3550#section-6.7).
/// The core round-trips the name and payload without interpreting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App<'a> {
    pub subtype: u8,
    pub source: u32,
    pub name: [u8; 4],
    pub data: &'a [u8],
}

impl<'a> App<'a> {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtcp::App;
    ///
    /// let app = App {
    ///     subtype: 0,
    ///     source: 7,
    ///     name: *b"TEST",
    ///     data: &[1, 2, 3, 4],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// app.clone().encode(&mut bytes).unwrap();
    ///
    /// assert_eq!(App::decode(&bytes).unwrap(), app);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) -> Result<(), EncodeError> {
        if self.data.len() % 4 != 0 {
            return Err(EncodeError::AppDataNotWordAligned);
        }

        let length_words = (2 + self.data.len() / 4) as u16;
        Header::encode(false, self.subtype, PacketType::App, length_words, bytes);

        bytes.put_u32(self.source);
        bytes.extend_from_slice(&self.name);
        bytes.extend_from_slice(self.data);
        Ok(())
    }

    pub fn decode(bytes: &'a [u8]) -> Result<Self, Error> {
        let header = Header::decode(bytes)?;
        let end = header.byte_len();
        if bytes.len() < end {
            return Err(Error::Truncated);
        }

        Self::decode_body(&header, &bytes[super::HEADER_LEN..end])
    }

    pub(crate) fn decode_body(header: &Header, body: &'a [u8]) -> Result<Self, Error> {
        if body.len() < 8 {
            return Err(Error::Truncated);
        }

        Ok(Self {
            subtype: header.count,
            source: u32::from_be_bytes(body[0..4].try_into()?),
            name: body[4..8].try_into()?,
            data: &body[8..],
        })
    }
}
