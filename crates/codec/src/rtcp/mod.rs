//! RTCP control packets, per [RFC 3550 §6](https://www.rfc-editor.org/rfc/rfc3550#section-6).
//!
//! Every RTCP packet shares a 4-octet common header (version, padding,
//! an item-count-or-subtype field, packet type, and a length in 32-bit
//! words minus one) ahead of a payload whose shape depends on the packet
//! type. [`Packet`] is the decoded union of the five kinds this crate
//! understands; [`decode_compound`] applies the validity check from
//! [RFC 3550 §A.2](https://www.rfc-editor.org/rfc/rfc3550#appendix-A.2)
//! and splits a received datagram into its sub-packets.

pub mod app;
pub mod bye;
pub mod receiver_report;
pub mod sdes;
pub mod sender_report;

use bytes::{BufMut, BytesMut};
use num_enum::TryFromPrimitive;

pub use app::App;
pub use bye::Bye;
pub use receiver_report::ReceiverReport;
pub use sdes::{Sdes, SdesChunk, SdesItem};
pub use sender_report::SenderReport;

use crate::{Error, RTP_VERSION};

pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    SenderReport = 200,
    ReceiverReport = 201,
    SourceDescription = 202,
    Bye = 203,
    App = 204,
}

/// The decoded common header of one RTCP sub-packet.
pub(crate) struct Header {
    pub padding: bool,
    /// Report count, SDES chunk count, or subtype — meaning depends on
    /// `packet_type`.
    pub count: u8,
    pub packet_type: PacketType,
    /// Length of this sub-packet in 32-bit words, minus one, including
    /// the header itself.
    pub length_words: u16,
}

impl Header {
    pub(crate) fn encode(padding: bool, count: u8, packet_type: PacketType, length_words: u16, bytes: &mut BytesMut) {
        bytes.put_u8((RTP_VERSION << 6) | ((padding as u8) << 5) | (count & 0x1f));
        bytes.put_u8(packet_type as u8);
        bytes.put_u16(length_words);
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }

        let version = bytes[0] >> 6;
        if version != RTP_VERSION {
            return Err(Error::UnsupportedVersion);
        }

        Ok(Self {
            padding: (bytes[0] & 0b0010_0000) != 0,
            count: bytes[0] & 0b0001_1111,
            packet_type: PacketType::try_from(bytes[1]).map_err(|_| Error::Malformed)?,
            length_words: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }

    /// Total length of this sub-packet in bytes, header included.
    pub(crate) fn byte_len(&self) -> usize {
        (self.length_words as usize + 1) * 4
    }
}

/// One decoded RTCP sub-packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet<'a> {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(Sdes),
    Bye(Bye),
    App(App<'a>),
}

impl<'a> Packet<'a> {
    pub fn decode(bytes: &'a [u8]) -> Result<Self, Error> {
        let header = Header::decode(bytes)?;
        let end = header.byte_len();
        if bytes.len() < end {
            return Err(Error::Truncated);
        }

        let body = &bytes[HEADER_LEN..end];
        Ok(match header.packet_type {
            PacketType::SenderReport => Packet::SenderReport(SenderReport::decode_body(&header, body)?),
            PacketType::ReceiverReport => Packet::ReceiverReport(ReceiverReport::decode_body(&header, body)?),
            PacketType::SourceDescription => Packet::SourceDescription(Sdes::decode_body(&header, body)?),
            PacketType::Bye => Packet::Bye(Bye::decode_body(&header, body)?),
            PacketType::App => Packet::App(App::decode_body(&header, body)?),
        })
    }
}

/// Validate a received datagram as a compound RTCP packet and split it
/// into its sub-packets, per the five rules of
/// [RFC 3550 §A.2](https://www.rfc-editor.org/rfc/rfc3550#appendix-A.2):
/// non-empty length that is a multiple of 4, version 2 on the first
/// sub-packet, SR or RR as the first sub-packet, padding only on the
/// last sub-packet, and sub-packet lengths that exactly partition the
/// datagram.
///
/// # Test
///
/// ```
/// use bytes::BytesMut;
/// use rtp_codec::rtcp::{Packet, ReceiverReport, decode_compound};
///
/// let rr = ReceiverReport {
///     ssrc: 1,
///     reports: Vec::new(),
/// };
///
/// let mut bytes = BytesMut::new();
/// rr.clone().encode(&mut bytes);
///
/// let packets = decode_compound(&bytes).unwrap();
/// assert_eq!(packets.len(), 1);
/// assert_eq!(packets[0], Packet::ReceiverReport(rr));
/// ```
pub fn decode_compound(bytes: &[u8]) -> Result<Vec<Packet<'_>>, Error> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::MalformedCompound);
    }

    let first = Header::decode(bytes).map_err(|_| Error::MalformedCompound)?;
    if !matches!(first.packet_type, PacketType::SenderReport | PacketType::ReceiverReport) {
        return Err(Error::MalformedCompound);
    }

    let mut packets = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let header = Header::decode(&bytes[offset..])?;
        let sub_len = header.byte_len();
        let is_last = offset + sub_len >= bytes.len();

        if header.padding && !is_last {
            return Err(Error::MalformedCompound);
        }

        if offset + sub_len > bytes.len() {
            return Err(Error::MalformedCompound);
        }

        packets.push(Packet::decode(&bytes[offset..offset + sub_len])?);
        offset += sub_len;
    }

    if offset != bytes.len() {
        return Err(Error::MalformedCompound);
    }

    Ok(packets)
}
