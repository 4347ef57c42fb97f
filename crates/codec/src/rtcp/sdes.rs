use bytes::{BufMut, BytesMut};

use super::{Header, PacketType};
use crate::{Error, pad32};

/// Longest text an SDES item can carry — its length is a single octet.
const MAX_SDES_TEXT: usize = 255;

const END: u8 = 0;
const CNAME: u8 = 1;
const NAME: u8 = 2;
const EMAIL: u8 = 3;
const PHONE: u8 = 4;
const LOC: u8 = 5;
const TOOL: u8 = 6;
const NOTE: u8 = 7;
const PRIV: u8 = 8;

/// One Source Description item, per [RFC 3550 §6.5](https://www.rfc-editor.org/rfc/rfc3550#section-6.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdesItem {
    Cname(String),
    Name(String),
    Email(String),
    Phone(String),
    Loc(String),
    Tool(String),
    Note(String),
    Priv { prefix: String, value: String },
}

impl SdesItem {
    fn type_byte(&self) -> u8 {
        match self {
            Self::Cname(_) => CNAME,
            Self::Name(_) => NAME,
            Self::Email(_) => EMAIL,
            Self::Phone(_) => PHONE,
            Self::Loc(_) => LOC,
            Self::Tool(_) => TOOL,
            Self::Note(_) => NOTE,
            Self::Priv { .. } => PRIV,
        }
    }

    fn encode(&self, bytes: &mut BytesMut) {
        bytes.put_u8(self.type_byte());
        match self {
            Self::Cname(text)
            | Self::Name(text)
            | Self::Email(text)
            | Self::Phone(text)
            | Self::Loc(text)
            | Self::Tool(text)
            | Self::Note(text) => {
                let text = truncate_text(text, MAX_SDES_TEXT);
                bytes.put_u8(text.len() as u8);
                bytes.extend_from_slice(text.as_bytes());
            }
            Self::Priv { prefix, value } => {
                let prefix = truncate_text(prefix, MAX_SDES_TEXT - 1);
                let value = truncate_text(value, MAX_SDES_TEXT - 1 - prefix.len());
                bytes.put_u8((1 + prefix.len() + value.len()) as u8);
                bytes.put_u8(prefix.len() as u8);
                bytes.extend_from_slice(prefix.as_bytes());
                bytes.extend_from_slice(value.as_bytes());
            }
        }
    }

    fn decode(item_type: u8, text: &[u8]) -> Result<Self, Error> {
        let as_string = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        Ok(match item_type {
            CNAME => Self::Cname(as_string(text)),
            NAME => Self::Name(as_string(text)),
            EMAIL => Self::Email(as_string(text)),
            PHONE => Self::Phone(as_string(text)),
            LOC => Self::Loc(as_string(text)),
            TOOL => Self::Tool(as_string(text)),
            NOTE => Self::Note(as_string(text)),
            PRIV => {
                let prefix_len = *text.first().ok_or(Error::Truncated)? as usize;
                if text.len() < 1 + prefix_len {
                    return Err(Error::Truncated);
                }

                Self::Priv {
                    prefix: as_string(&text[1..1 + prefix_len]),
                    value: as_string(&text[1 + prefix_len..]),
                }
            }
            _ => return Err(Error::Malformed),
        })
    }
}

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

/// One chunk of a Source Description packet: a source identifier and the
/// items describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdesChunk {
    pub source: u32,
    pub items: Vec<SdesItem>,
}

impl SdesChunk {
    fn encode(&self, bytes: &mut BytesMut) {
        let start = bytes.len();
        bytes.put_u32(self.source);
        for item in &self.items {
            item.encode(bytes);
        }
        bytes.put_u8(END);

        let written = bytes.len() - start;
        for _ in 0..(pad32(written) - written) {
            bytes.put_u8(0);
        }
    }

    fn decode(buf: &[u8]) -> Result<(Self, usize), Error> {
        if buf.len() < 4 {
            return Err(Error::Truncated);
        }

        let source = u32::from_be_bytes(buf[0..4].try_into()?);
        let mut offset = 4;
        let mut items = Vec::new();

        loop {
            if offset >= buf.len() {
                return Err(Error::Malformed);
            }

            let item_type = buf[offset];
            if item_type == END {
                offset += 1;
                break;
            }

            if offset + 2 > buf.len() {
                return Err(Error::Truncated);
            }

            let len = buf[offset + 1] as usize;
            let text_start = offset + 2;
            let text_end = text_start + len;
            if buf.len() < text_end {
                return Err(Error::Truncated);
            }

            items.push(SdesItem::decode(item_type, &buf[text_start..text_end])?);
            offset = text_end;
        }

        Ok((Self { source, items }, pad32(offset)))
    }
}

/// A Source Description packet, per [RFC 3550 §6.5](https://www.rfc-editor.org/rfc/rfc3550#section-6.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdes {
    pub chunks: Vec<SdesChunk>,
}

impl Sdes {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::rtcp::{Sdes, SdesChunk, SdesItem};
    ///
    /// let sdes = Sdes {
    ///     chunks: vec![SdesChunk {
    ///         source: 1,
    ///         items: vec![SdesItem::Cname("alice@example".into())],
    ///     }],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// sdes.clone().encode(&mut bytes);
    ///
    /// assert_eq!(bytes.len() % 4, 0);
    /// assert_eq!(Sdes::decode(&bytes).unwrap(), sdes);
    /// ```
    pub fn encode(self, bytes: &mut BytesMut) {
        let header_at = bytes.len();
        Header::encode(false, self.chunks.len() as u8, PacketType::SourceDescription, 0, bytes);

        for chunk in &self.chunks {
            chunk.encode(bytes);
        }

        let length_words = ((bytes.len() - header_at) / 4) as u16 - 1;
        bytes[header_at + 2..header_at + 4].copy_from_slice(&length_words.to_be_bytes());
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
        let mut chunks = Vec::with_capacity(header.count as usize);
        let mut offset = 0;

        for _ in 0..header.count {
            let (chunk, consumed) = SdesChunk::decode(&body[offset..])?;
            chunks.push(chunk);
            offset += consumed;
        }

        Ok(Self { chunks })
    }
}
