//! The session facade: the single entry point gluing the codec,
//! per-source statistics, membership table, and scheduler together.

use bytes::BytesMut;
use codec::{
    EncodeError,
    report_block::ReportBlock,
    rtcp::{Packet, ReceiverReport, Sdes, SdesChunk, SdesItem, SenderReport, decode_compound},
    rtp::RtpPacket,
};
use rand::Rng;

use crate::{
    collaborators::Transport,
    membership::Membership,
    scheduler::{EventKind, Scheduler, TimerOutcome},
};

/// `Initial → Running → Closing → Closed`, per the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initial,
    Running,
    Closing,
    Closed,
}

/// Construction-time options for a [`Session`]. Never sourced from a
/// file, environment variable, or CLI — that layering is the host
/// application's responsibility, not the core's.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// The RTP payload clock rate, in Hz, used to interpret arrival times
    /// against RTP timestamps for jitter estimation.
    pub clock_rate: u32,
    /// Nominal bandwidth of the whole RTP session, in bits/sec. RTCP
    /// traffic is budgeted at 5% of this.
    pub session_bandwidth_bps: f64,
    /// CNAME advertised in this session's outgoing SDES.
    pub cname: String,
    /// Fixed local SSRC, or `None` to choose one at random.
    pub local_ssrc: Option<u32>,
}

struct LocalSource {
    ssrc: u32,
    sequence_number: u16,
    packets_sent: u64,
    octets_sent: u64,
}

/// The RTP/RTCP session state machine: dispatches inbound datagrams,
/// maintains per-source statistics and membership, and drives the RTCP
/// transmission scheduler.
///
/// Single-threaded and cooperative: every method is `&mut self` and runs
/// to completion without internal suspension. Embedding this behind a
/// lock or actor is the caller's responsibility.
pub struct Session<T: Transport> {
    transport: T,
    options: SessionOptions,
    local: LocalSource,
    membership: Membership,
    scheduler: Scheduler,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(options: SessionOptions, transport: T, now: f64) -> Self {
        let mut rng = rand::rng();
        let local_ssrc = options.local_ssrc.unwrap_or_else(|| rng.random());
        let sequence_number = rng.random();

        Self {
            transport,
            scheduler: Scheduler::new(options.session_bandwidth_bps, now),
            local: LocalSource {
                ssrc: local_ssrc,
                sequence_number,
                packets_sent: 0,
                octets_sent: 0,
            },
            membership: Membership::new(),
            options,
            state: SessionState::Initial,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_ssrc(&self) -> u32 {
        self.local.ssrc
    }

    /// Build and send an RTP packet carrying `payload`, which the caller
    /// has already packed via an external [`crate::collaborators::Profile`].
    pub fn on_rtp_send(&mut self, payload: &[u8], timestamp: u32, marker: bool) -> Result<(), EncodeError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }

        let sequence_number = self.local.sequence_number;
        self.local.sequence_number = self.local.sequence_number.wrapping_add(1);

        let mut bytes = BytesMut::with_capacity(12 + payload.len());
        RtpPacket {
            padding: false,
            marker,
            payload_type: 0,
            sequence_number,
            timestamp,
            ssrc: self.local.ssrc,
            csrc: Vec::new(),
            extension: None,
            payload,
        }
        .encode(&mut bytes)?;

        self.local.packets_sent += 1;
        self.local.octets_sent += payload.len() as u64;
        self.scheduler.mark_we_sent();

        self.transport.send(&bytes);
        Ok(())
    }

    /// Parse and apply one received RTP packet. Parse failures are
    /// dropped silently (logged at debug level), per the error design:
    /// a malformed datagram is not a session-level error.
    pub fn on_rtp_receive(&mut self, datagram: &[u8], now: f64) {
        if self.state == SessionState::Closed {
            return;
        }

        let packet = match RtpPacket::decode(datagram) {
            Ok(packet) => packet,
            Err(error) => {
                log::debug!("dropping malformed rtp packet: {error}");
                return;
            }
        };

        let ssrc = packet.ssrc;
        let was_known = self.membership.is_known(ssrc);
        if !was_known && self.state == SessionState::Closing {
            // Not admitting new members while winding down.
            return;
        }

        let source = self.membership.touch(ssrc, packet.sequence_number, now);

        if !was_known {
            // `Membership::touch` already primed the new source's sequence
            // state from this packet (the equivalent of RFC 3550's
            // `init_seq`); this first packet does not also go through
            // `update_seq`.
            log::trace!("new rtp source {ssrc:08x}");
        } else if source.update_seq(packet.sequence_number) {
            let arrival = (now * self.options.clock_rate as f64) as i64;
            source.update_jitter(arrival, packet.timestamp);
        }

        self.membership.mark_rtp_activity(ssrc, now);
    }

    /// Validate and apply one received compound RTCP datagram. A
    /// datagram that fails the compound validity check is dropped
    /// silently; a successfully parsed datagram always updates
    /// membership and scheduler state even if individual sub-packets
    /// describe sources we have not seen RTP from yet.
    pub fn on_rtcp_receive(&mut self, datagram: &[u8], now: f64) {
        if self.state == SessionState::Closed {
            return;
        }

        let packets = match decode_compound(datagram) {
            Ok(packets) => packets,
            Err(error) => {
                log::debug!("dropping malformed compound rtcp packet: {error}");
                return;
            }
        };

        self.scheduler.record_rtcp_size(datagram.len());

        for packet in packets {
            match packet {
                Packet::SenderReport(sr) => {
                    let was_known = self.membership.is_known(sr.ssrc);
                    if !was_known && self.state != SessionState::Closing {
                        self.membership.touch(sr.ssrc, 0, now);
                    }

                    if let Some(source) = self.membership.source_mut(sr.ssrc) {
                        let ntp_middle = ((sr.ntp_seconds as u64) << 16 | (sr.ntp_fraction as u64 >> 16)) as u32;
                        let now_65536 = (now * 65536.0) as u64;
                        source.record_sender_report(ntp_middle, now_65536);
                    }
                }
                Packet::ReceiverReport(rr) => {
                    if !self.membership.is_known(rr.ssrc) && self.state != SessionState::Closing {
                        self.membership.touch(rr.ssrc, 0, now);
                    }
                }
                Packet::SourceDescription(sdes) => {
                    for chunk in &sdes.chunks {
                        if !self.membership.is_known(chunk.source) && self.state != SessionState::Closing {
                            self.membership.touch(chunk.source, 0, now);
                        }
                    }
                }
                Packet::Bye(bye) => {
                    if self.state == SessionState::Closing {
                        // We are ourselves departing; RFC 3550 §6.3.4 has us
                        // treat a peer's BYE as if it were a member for
                        // bandwidth-sharing purposes rather than shrink our
                        // own count.
                        continue;
                    }

                    for source in &bye.sources {
                        self.membership.remove_member(*source);
                    }

                    let members_now = self.members();
                    let pmembers = self.scheduler.pmembers();
                    if members_now < pmembers {
                        self.scheduler.reverse_reconsider(now, members_now, pmembers);
                    }
                }
                Packet::App(app) => {
                    if !self.membership.is_known(app.source) && self.state != SessionState::Closing {
                        self.membership.touch(app.source, 0, now);
                    }
                }
            }
        }
    }

    /// Sweep sources that have gone silent for five reporting intervals,
    /// and clear sender status for sources silent for two. Call this once
    /// per scheduler timer evaluation.
    pub fn sweep_timeouts(&mut self, now: f64) {
        let interval = self.scheduler.rtcp_interval(self.membership.member_count() + 1, self.senders());
        self.membership.expire_senders(now, interval);

        let removed = self.membership.sweep_timeouts(now, interval);
        if removed > 0 {
            let members_now = self.members();
            let pmembers = self.scheduler.pmembers();
            if members_now < pmembers {
                self.scheduler.reverse_reconsider(now, members_now, pmembers);
            }
        }
    }

    /// Evaluate the scheduler's pending timer at the current time.
    /// Returns the RTCP compound packet transmitted, if any — the caller
    /// is responsible for rescheduling its own wakeup to
    /// [`Self::next_transmit_time`].
    pub fn on_timer_fired(&mut self, now: f64) -> Option<Vec<u8>> {
        let kind = if self.state == SessionState::Closing {
            EventKind::Bye
        } else {
            EventKind::Report
        };

        let members = self.members();
        let senders = self.senders();

        match self.scheduler.on_timer_fired(kind, now, members, senders) {
            TimerOutcome::Deferred => None,
            TimerOutcome::ReportSent => {
                if self.state == SessionState::Initial {
                    self.state = SessionState::Running;
                }

                let bytes = self.build_report(now);
                self.scheduler.record_rtcp_size(bytes.len());
                self.scheduler.clear_we_sent();
                self.transport.send(&bytes);
                Some(bytes.to_vec())
            }
            TimerOutcome::ByeSent => {
                let mut bytes = self.build_report(now);
                self.append_bye(&mut bytes);
                self.transport.send(&bytes);
                self.state = SessionState::Closed;
                Some(bytes.to_vec())
            }
        }
    }

    pub fn next_transmit_time(&self) -> f64 {
        self.scheduler.next_transmit_time()
    }

    /// Begin an orderly departure: schedules a BYE through the
    /// reconsideration algorithm rather than sending one immediately, so
    /// a burst of simultaneous departures does not flood the session.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        self.state = SessionState::Closing;
    }

    fn members(&self) -> usize {
        self.membership.member_count() + 1
    }

    fn senders(&self) -> usize {
        self.membership.sender_count() + if self.local.packets_sent > 0 { 1 } else { 0 }
    }

    fn build_report(&mut self, now: f64) -> BytesMut {
        let now_65536 = (now * 65536.0) as u64;
        let we_sent = self.local.packets_sent > 0;

        let reports: Vec<ReportBlock> = self
            .membership
            .valid_sources_mut()
            .map(|source| {
                let (last_sr, delay_since_last_sr) = source.last_sr_fields(now_65536);
                ReportBlock {
                    ssrc: source.ssrc(),
                    fraction_lost: source.fraction_lost(),
                    cumulative_lost: source.lost(),
                    extended_highest_sequence: source.extended_highest_sequence(),
                    jitter: source.jitter(),
                    last_sr,
                    delay_since_last_sr,
                }
            })
            .collect();

        let mut bytes = BytesMut::new();
        if we_sent {
            SenderReport {
                ssrc: self.local.ssrc,
                ntp_seconds: (now as u32).wrapping_add(2_208_988_800),
                ntp_fraction: ((now.fract()) * u32::MAX as f64) as u32,
                rtp_timestamp: (now * self.options.clock_rate as f64) as u32,
                packet_count: self.local.packets_sent as u32,
                octet_count: self.local.octets_sent as u32,
                reports,
            }
            .encode(&mut bytes);
        } else {
            ReceiverReport {
                ssrc: self.local.ssrc,
                reports,
            }
            .encode(&mut bytes);
        }

        Sdes {
            chunks: vec![SdesChunk {
                source: self.local.ssrc,
                items: vec![SdesItem::Cname(self.options.cname.clone())],
            }],
        }
        .encode(&mut bytes);

        bytes
    }

    fn append_bye(&self, bytes: &mut BytesMut) {
        codec::rtcp::Bye {
            sources: vec![self.local.ssrc],
            reason: None,
        }
        .encode(bytes)
        .expect("a single-source bye always encodes");
    }
}
