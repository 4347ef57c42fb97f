//! The RTCP transmission scheduler: the "reconsideration" algorithm of
//! [RFC 3550 §6.3](https://www.rfc-editor.org/rfc/rfc3550#section-6.3),
//! which adapts the interval between RTCP reports to current membership
//! size and the session's bandwidth budget, and which avoids bursts of
//! traffic when membership shrinks suddenly (a wave of BYEs).

use rand::Rng;

/// Euler's number minus 1.5; compensates for the bias introduced by
/// reconsideration (RFC 3550 §6.3.1).
const COMPENSATION_CONSTANT: f64 = std::f64::consts::E - 1.5;

const MINIMUM_INTERVAL_SECONDS: f64 = 5.0;

/// The reason the scheduler's timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Report,
    Bye,
}

/// Outcome of [`Scheduler::on_timer_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// `tn` was still in the future; the timer was rescheduled without
    /// transmitting anything.
    Deferred,
    /// A report was sent; the scheduler has rescheduled itself.
    ReportSent,
    /// A BYE was sent; the session is now closed.
    ByeSent,
}

/// Scheduling state for one session's outbound RTCP traffic.
pub struct Scheduler {
    initial: bool,
    we_sent: bool,
    session_bandwidth_bps: f64,
    rtcp_bandwidth_octets_per_sec: f64,
    avg_rtcp_size: f64,
    tp: f64,
    tn: f64,
    pmembers: usize,
}

impl Scheduler {
    /// `session_bandwidth_bps` is the nominal bandwidth of the whole RTP
    /// session; RTCP traffic is budgeted at 5% of it per RFC 3550 §6.2.
    pub fn new(session_bandwidth_bps: f64, now: f64) -> Self {
        Self {
            initial: true,
            we_sent: false,
            session_bandwidth_bps,
            rtcp_bandwidth_octets_per_sec: session_bandwidth_bps * 0.05 / 8.0,
            avg_rtcp_size: 28.0 + 20.0,
            tp: now,
            tn: now,
            pmembers: 1,
        }
    }

    pub fn next_transmit_time(&self) -> f64 {
        self.tn
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn mark_we_sent(&mut self) {
        self.we_sent = true;
    }

    pub fn clear_we_sent(&mut self) {
        self.we_sent = false;
    }

    /// Compute the next RTCP transmission interval, per
    /// [RFC 3550 §6.3.1](https://www.rfc-editor.org/rfc/rfc3550#section-6.3.1).
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session::scheduler::Scheduler;
    ///
    /// // 20 kbit/s session, one known member, nobody sending yet.
    /// let scheduler = Scheduler::new(20_000.0, 0.0);
    /// let interval = scheduler.rtcp_interval(1, 0);
    ///
    /// // min_time is halved while initial (2.5s), then scaled by a random
    /// // factor in [0.5, 1.5] and divided by the compensation constant.
    /// assert!(interval >= 2.5 * 0.5 / 1.2183);
    /// assert!(interval <= 2.5 * 1.5 / 1.2182);
    /// ```
    pub fn rtcp_interval(&self, members: usize, senders: usize) -> f64 {
        let mut min_time = MINIMUM_INTERVAL_SECONDS;
        if self.initial {
            min_time /= 2.0;
        }

        let mut n = members.max(1) as f64;
        let mut bandwidth = self.rtcp_bandwidth_octets_per_sec;

        if senders > 0 && (senders as f64) <= (members as f64) * 0.25 {
            if self.we_sent {
                bandwidth *= 0.25;
                n = senders as f64;
            } else {
                bandwidth *= 0.75;
                n = (members - senders) as f64;
            }
        }

        let mut t = self.avg_rtcp_size * n / bandwidth.max(f64::MIN_POSITIVE);
        if t < min_time {
            t = min_time;
        }

        let randomized = t * rand::rng().random_range(0.5..=1.5);
        randomized / COMPENSATION_CONSTANT
    }

    /// Fold a transmitted or received compound RTCP packet's size into
    /// the running average used by [`Self::rtcp_interval`].
    pub fn record_rtcp_size(&mut self, size: usize) {
        self.avg_rtcp_size = (1.0 / 16.0) * size as f64 + (15.0 / 16.0) * self.avg_rtcp_size;
    }

    /// Evaluate a pending timer event at the current time, per the timer
    /// reconsideration rule: never transmit without first checking that
    /// the recomputed `tn` has actually elapsed.
    pub fn on_timer_fired(&mut self, kind: EventKind, tc: f64, members: usize, senders: usize) -> TimerOutcome {
        let t = self.rtcp_interval(members, senders);
        self.tn = self.tp + t;

        if self.tn > tc {
            return TimerOutcome::Deferred;
        }

        match kind {
            EventKind::Bye => TimerOutcome::ByeSent,
            EventKind::Report => {
                self.tp = tc;
                let t = self.rtcp_interval(members, senders);
                self.tn = tc + t;
                self.initial = false;
                self.pmembers = members;
                TimerOutcome::ReportSent
            }
        }
    }

    /// Apply reverse reconsideration after membership shrinks (typically
    /// from a received BYE), per [RFC 3550 §6.3.4](https://www.rfc-editor.org/rfc/rfc3550#section-6.3.4).
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session::scheduler::Scheduler;
    ///
    /// let mut scheduler = Scheduler::new(64_000.0, 0.0);
    /// scheduler.set_pmembers(10);
    /// scheduler.set_tp(0.0);
    /// scheduler.set_tn(20.0);
    ///
    /// scheduler.reverse_reconsider(10.0, 5, 10);
    ///
    /// assert_eq!(scheduler.next_transmit_time(), 15.0);
    /// assert_eq!(scheduler.pmembers(), 5);
    /// ```
    pub fn reverse_reconsider(&mut self, tc: f64, members: usize, pmembers_before: usize) {
        if members >= pmembers_before {
            return;
        }

        let ratio = members as f64 / pmembers_before as f64;
        self.tn = tc + ratio * (self.tn - tc);
        self.tp = tc - ratio * (tc - self.tp);
        self.pmembers = members;
    }

    pub fn pmembers(&self) -> usize {
        self.pmembers
    }

    pub fn set_pmembers(&mut self, pmembers: usize) {
        self.pmembers = pmembers;
    }

    pub fn tp(&self) -> f64 {
        self.tp
    }

    pub fn set_tp(&mut self, tp: f64) {
        self.tp = tp;
    }

    pub fn set_tn(&mut self, tn: f64) {
        self.tn = tn;
    }
}
