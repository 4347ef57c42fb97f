use bytes::{BufMut, BytesMut};

use super::{Header, PacketType};
use crate::{EncodeError, Error, pad32};

/// Longest reason string a BYE can carry — its length is a single octet.
const MAX_REASON_LEN: usize = 255;

/// Truncate `text` to at most `max` octets, on a UTF-8 char boundary.
fn truncate_text(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// A Goodbye packet, per [RFC 3550 §6.6](https://www.rfc-editor.org/rfc/rfc3550#section-6.6).
/// Announces that one or more sources are leaving the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bye {
    pub sources: Vec<u32>,
    pub reason: Option<String>,
}

impl Bye {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtcp::Bye;
    ///
    /// let bye = Bye {
    ///     sources: vec![1, 2],
    ///     reason: Some("camera off".into()),
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// bye.clone().encode(&mut bytes).unwrap();
    ///
    /// assert_eq!(bytes.len() % 4, 0);
    /// assert_eq!(Bye::decode(&bytes).unwrap(), bye);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) -> Result<(), EncodeError> {
        if self.sources.is_empty() {
            return Err(EncodeError::EmptyByeSourceList);
        }
        if self.sources.len() > 31 {
            return Err(EncodeError::TooManyCsrcs);
        }

        let header_at = bytes.len();
        Header::encode(false, self.sources.len() as u8, PacketType::Bye, 0, bytes);

        for source in &self.sources {
            bytes.put_u32(*source);
        }

        if let Some(reason) = &self.reason {
            let reason = truncate_text(reason, MAX_REASON_LEN);
            bytes.put_u8(reason.len() as u8);
            bytes.extend_from_slice(reason.as_bytes());
        }

        let written = bytes.len() - header_at;
        for _ in 0..(pad32(written) - written) {
            bytes.put_u8(0);
        }

        let length_words = ((bytes.len() - header_at) / 4) as u16 - 1;
        bytes[header_at + 2..header_at + 4].copy_from_slice(&length_words.to_be_bytes());
        Ok(())
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
        let source_bytes = header.count as usize * 4;
        if body.len() < source_bytes {
            return Err(Error::Truncated);
        }

        let mut sources = Vec::with_capacity(header.count as usize);
        for chunk in body[..source_bytes].chunks_exact(4) {
            sources.push(u32::from_be_bytes(chunk.try_into()?));
        }

        let reason = if body.len() > source_bytes {
            let len = body[source_bytes] as usize;
            let text_start = source_bytes + 1;
            let text_end = text_start + len;
            if body.len() < text_end {
                return Err(Error::Truncated);
            }

            Some(String::from_utf8_lossy(&body[text_start..text_end]).into_owned())
        } else {
            None
        };

        Ok(Self { sources, reason })
    }
}
