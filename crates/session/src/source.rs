//! Per-source receive statistics: sequence validation, cycle counting,
//! loss accounting, and jitter estimation, per
//! [RFC 3550 Appendix A.8](https://www.rfc-editor.org/rfc/rfc3550#appendix-A.8).

pub const RTP_SEQ_MOD: u32 = 1 << 16;
pub const MAX_DROPOUT: u16 = 3000;
pub const MAX_MISORDER: u16 = 100;
pub const MIN_SEQUENTIAL: u16 = 2;

/// Sequence, loss, and jitter bookkeeping for one SSRC.
///
/// A freshly constructed record starts on probation: [`Source::update_seq`]
/// must see `probation` consecutive in-order packets before the source is
/// considered valid and its statistics start counting toward reports.
#[derive(Debug, Clone)]
pub struct Source {
    ssrc: u32,
    base_seq: u16,
    max_seq: u16,
    cycles: u32,
    bad_seq: u32,
    probation: u16,
    received: u64,
    expected_prior: u64,
    received_prior: u64,
    transit: Option<i64>,
    jitter: u32,
    last_sr_ntp_middle: u32,
    last_sr_received_at: Option<u64>,
}

impl Source {
    /// Construct a new source on probation, primed with the first
    /// sequence number seen from it.
    pub fn new(ssrc: u32, seq: u16) -> Self {
        let mut source = Self {
            ssrc,
            base_seq: seq,
            max_seq: seq,
            cycles: 0,
            bad_seq: RTP_SEQ_MOD + 1,
            probation: MIN_SEQUENTIAL,
            received: 0,
            expected_prior: 0,
            received_prior: 0,
            transit: None,
            jitter: 0,
            last_sr_ntp_middle: 0,
            last_sr_received_at: None,
        };
        source.init(seq);
        source
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn is_valid(&self) -> bool {
        self.probation == 0
    }

    fn init(&mut self, seq: u16) {
        self.base_seq = seq;
        self.max_seq = seq;
        self.bad_seq = RTP_SEQ_MOD + 1;
        self.cycles = 0;
        self.received = 0;
        self.received_prior = 0;
        self.expected_prior = 0;
    }

    /// Feed one received sequence number through the validation state
    /// machine. Returns `true` if the packet should be counted toward
    /// this source's statistics.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session::source::Source;
    ///
    /// let mut source = Source::new(1, 1000);
    /// assert!(!source.is_valid());
    ///
    /// assert!(!source.update_seq(1001));
    /// assert!(!source.is_valid());
    ///
    /// assert!(source.update_seq(1002));
    /// assert!(source.is_valid());
    /// assert_eq!(source.received(), 1);
    /// ```
    pub fn update_seq(&mut self, seq: u16) -> bool {
        if self.probation > 0 {
            if seq == self.max_seq.wrapping_add(1) {
                self.probation -= 1;
                self.max_seq = seq;
                if self.probation == 0 {
                    self.init(seq);
                    self.received = 1;
                    return true;
                }
            } else {
                self.probation = MIN_SEQUENTIAL - 1;
                self.max_seq = seq;
            }
            return false;
        }

        let udelta = seq.wrapping_sub(self.max_seq) as u32;

        if udelta < MAX_DROPOUT as u32 {
            if seq < self.max_seq {
                self.cycles += RTP_SEQ_MOD;
            }
            self.max_seq = seq;
        } else if udelta <= RTP_SEQ_MOD - MAX_MISORDER as u32 {
            if seq as u32 == self.bad_seq {
                self.init(seq);
            } else {
                self.bad_seq = (seq as u32 + 1) & (RTP_SEQ_MOD - 1);
                log::debug!(
                    "ssrc {:08x}: sequence jump to {} treated as tentative restart (expected {})",
                    self.ssrc,
                    seq,
                    self.max_seq.wrapping_add(1)
                );
                return false;
            }
        } else {
            // Duplicate or reordered packet within the misorder window; no
            // structural update.
        }

        self.received += 1;
        true
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// `(cycles << 16) | max_seq`, as carried in a receiver report block.
    pub fn extended_highest_sequence(&self) -> u32 {
        self.cycles.wrapping_add(self.max_seq as u32)
    }

    /// Extended count of packets expected since `init`: `cycles + max_seq -
    /// base_seq + 1`.
    pub fn expected(&self) -> i64 {
        self.cycles as i64 + self.max_seq as i64 - self.base_seq as i64 + 1
    }

    /// Cumulative packets lost, clipped to the signed 24-bit range used by
    /// the wire format.
    pub fn lost(&self) -> i32 {
        let lost = self.expected() - self.received as i64;
        lost.clamp(-(1 << 23), (1 << 23) - 1) as i32
    }

    /// Fraction of packets lost since the previous call, as the 8-bit
    /// fixed-point value used in a receiver report block. Also advances
    /// the interval snapshots used for the next call.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session::source::Source;
    ///
    /// let mut source = Source::new(1, 0);
    /// source.update_seq(1);
    /// source.update_seq(2); // exits probation, received = 1, base_seq = 2
    ///
    /// for seq in 3..=150 {
    ///     source.update_seq(seq);
    /// }
    ///
    /// source.update_seq(201); // a 50-packet gap
    ///
    /// assert_eq!(source.received(), 150);
    /// assert_eq!(source.expected(), 200);
    /// assert_eq!(source.fraction_lost(), 64);
    /// ```
    pub fn fraction_lost(&mut self) -> u8 {
        let expected = self.expected();
        let expected_interval = expected - self.expected_prior as i64;
        self.expected_prior = expected as u64;

        let received_interval = self.received as i64 - self.received_prior as i64;
        self.received_prior = self.received;

        let lost_interval = expected_interval - received_interval;

        if expected_interval <= 0 || lost_interval <= 0 {
            0
        } else {
            (((lost_interval << 8) / expected_interval).clamp(0, 255)) as u8
        }
    }

    /// Update the interarrival jitter estimate from one packet's arrival.
    ///
    /// `arrival` and `rtp_timestamp` must be expressed in the same
    /// payload-clock units (the caller converts wall-clock arrival time
    /// using the stream's clock rate before calling this).
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session::source::Source;
    ///
    /// let mut source = Source::new(1, 0);
    /// source.update_jitter(1000, 0);
    /// source.update_jitter(1160, 160);
    /// assert_eq!(source.jitter(), 0);
    /// ```
    pub fn update_jitter(&mut self, arrival: i64, rtp_timestamp: u32) {
        let transit = arrival - rtp_timestamp as i64;

        if let Some(previous) = self.transit {
            let d = (transit - previous).unsigned_abs();
            self.jitter = (self.jitter as i64 + (d as i64 - ((self.jitter as i64 + 8) >> 4))) as u32;
        }

        self.transit = Some(transit);
    }

    /// Current jitter estimate in payload-clock units, as reported in a
    /// receiver report block (the internal estimate is kept 4x scaled).
    pub fn jitter(&self) -> u32 {
        self.jitter >> 4
    }

    pub fn record_sender_report(&mut self, ntp_middle: u32, received_at: u64) {
        self.last_sr_ntp_middle = ntp_middle;
        self.last_sr_received_at = Some(received_at);
    }

    /// `(last_sr, delay_since_last_sr)` fields for a report block built
    /// `now`, where `now` and the stored arrival time share the same
    /// 1/65536-second unit.
    pub fn last_sr_fields(&self, now: u64) -> (u32, u32) {
        match self.last_sr_received_at {
            Some(received_at) => (self.last_sr_ntp_middle, now.saturating_sub(received_at) as u32),
            None => (0, 0),
        }
    }
}
