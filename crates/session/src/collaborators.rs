//! External collaborator contracts. The session core consumes these as
//! plain traits and never implements a concrete transport or media
//! payload packer itself — those are host-application concerns.

/// The non-blocking datagram transport the session sends RTP and RTCP
/// packets over. `send` must not block; a transport that can apply
/// backpressure needs an extension beyond this contract.
pub trait Transport {
    fn send(&self, datagram: &[u8]);

    /// Registers a callback for each received datagram. The session never
    /// calls this itself — `Session::on_rtp_receive`/`on_rtcp_receive` are
    /// driven directly from the embedder's own reactor instead — but it's
    /// part of the collaborator contract a concrete transport may use to
    /// wire itself into that reactor.
    fn on_readable(&mut self, _callback: Box<dyn FnMut(&[u8])>) {}
}

/// Categorizes the kind of media a [`Profile`] packs, for attribute
/// derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    ContinuousAudio,
    PacketizedAudio,
    Video,
    Text,
    Other,
}

/// Describes how to pack and unpack one RTP payload type's media frames.
/// The session core treats payloads as opaque bytes; a `Profile`
/// implementation lives entirely outside it.
pub trait Profile {
    fn mime_type(&self) -> &str;
    fn payload_kind(&self) -> PayloadKind;
    fn clock_rate(&self) -> u32;
    fn samples_per_frame(&self) -> u32;
    fn channels(&self) -> u32;
    fn bits_per_sample(&self) -> u32;
    fn frames_per_packet_hint(&self) -> u32;
    fn auto_adjust_sent_rate(&self) -> bool;

    fn pack(&self, frames: &[u8]) -> Vec<u8>;
    fn unpack(&self, payload: &[u8]) -> Vec<u8>;

    /// One frame of silence in this profile's native encoding, used to
    /// fill gaps when the host has nothing to send. Comfort noise or a
    /// codec-specific silence frame belongs here instead of plain zero
    /// bytes where the encoding calls for it (e.g. a-law/mu-law's `0xff`).
    fn zero_pattern(&self) -> Vec<u8> {
        vec![0; self.bytes_per_frame() as usize]
    }

    fn bytes_per_frame(&self) -> u32 {
        (self.samples_per_frame() * self.bits_per_sample() + 7) / 8
    }

    fn frames_per_second(&self) -> u32 {
        self.clock_rate() * self.channels() / self.samples_per_frame().max(1)
    }

    fn payload_bitrate(&self) -> u32 {
        self.clock_rate() * self.channels() * self.bits_per_sample()
    }
}
