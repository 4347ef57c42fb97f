//! The session membership table: one [`Source`] record per SSRC observed,
//! plus the bookkeeping reconsideration and timeout sweeping need —
//! whether a source currently counts as a sender, and when it was last
//! heard from.

use ahash::AHashMap;

use crate::source::Source;

struct Entry {
    source: Source,
    is_sender: bool,
    last_rtp_at: Option<f64>,
    last_activity_at: f64,
}

/// Known participants of a session, keyed by SSRC.
#[derive(Default)]
pub struct Membership {
    entries: AHashMap<u32, Entry>,
}

impl Membership {
    pub fn new() -> Self {
        Self { entries: AHashMap::new() }
    }

    pub fn is_known(&self, ssrc: u32) -> bool {
        self.entries.contains_key(&ssrc)
    }

    /// Insert a new member if absent, and record `now` as activity either
    /// way. Returns a mutable reference to its source record.
    pub fn touch(&mut self, ssrc: u32, seq_if_new: u16, now: f64) -> &mut Source {
        let entry = self.entries.entry(ssrc).or_insert_with(|| Entry {
            source: Source::new(ssrc, seq_if_new),
            is_sender: false,
            last_rtp_at: None,
            last_activity_at: now,
        });
        entry.last_activity_at = now;
        &mut entry.source
    }

    pub fn remove_member(&mut self, ssrc: u32) {
        self.entries.remove(&ssrc);
    }

    pub fn source(&self, ssrc: u32) -> Option<&Source> {
        self.entries.get(&ssrc).map(|e| &e.source)
    }

    pub fn source_mut(&mut self, ssrc: u32) -> Option<&mut Source> {
        self.entries.get_mut(&ssrc).map(|e| &mut e.source)
    }

    pub fn is_sender(&self, ssrc: u32) -> bool {
        self.entries.get(&ssrc).is_some_and(|e| e.is_sender)
    }

    /// Mark a source as actively sending RTP as of `now`.
    pub fn mark_rtp_activity(&mut self, ssrc: u32, now: f64) {
        if let Some(entry) = self.entries.get_mut(&ssrc) {
            entry.is_sender = true;
            entry.last_rtp_at = Some(now);
        }
    }

    pub fn remove_sender(&mut self, ssrc: u32) {
        if let Some(entry) = self.entries.get_mut(&ssrc) {
            entry.is_sender = false;
        }
    }

    /// # Test
    ///
    /// ```
    /// use rtp_session::membership::Membership;
    ///
    /// let mut members = Membership::new();
    /// members.touch(1, 0, 0.0);
    /// members.touch(2, 0, 0.0);
    /// assert_eq!(members.member_count(), 2);
    ///
    /// members.remove_member(1);
    /// assert_eq!(members.member_count(), 1);
    /// ```
    pub fn member_count(&self) -> usize {
        self.entries.len()
    }

    pub fn sender_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_sender).count()
    }

    pub fn ssrcs(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn valid_sources(&self) -> impl Iterator<Item = &Source> + '_ {
        self.entries.values().map(|e| &e.source).filter(|s| s.is_valid())
    }

    pub fn valid_sources_mut(&mut self) -> impl Iterator<Item = &mut Source> + '_ {
        self.entries.values_mut().map(|e| &mut e.source).filter(|s| s.is_valid())
    }

    /// Clear sender status for sources that have not sent RTP within the
    /// last two reporting intervals.
    pub fn expire_senders(&mut self, now: f64, reporting_interval: f64) {
        for entry in self.entries.values_mut() {
            if let Some(last_rtp_at) = entry.last_rtp_at {
                if now - last_rtp_at > 2.0 * reporting_interval {
                    entry.is_sender = false;
                }
            }
        }
    }

    /// Remove sources that have produced no RTP or RTCP activity within
    /// the last five reporting intervals, per
    /// [RFC 3550 §6.3.5](https://www.rfc-editor.org/rfc/rfc3550#section-6.3.5).
    /// Returns the number of members removed, for reverse-reconsideration
    /// bookkeeping.
    pub fn sweep_timeouts(&mut self, now: f64, reporting_interval: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.last_activity_at <= 5.0 * reporting_interval);
        before - self.entries.len()
    }
}
