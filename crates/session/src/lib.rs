//! RTP/RTCP session state: per-source receive statistics, the
//! participant membership table, the RTCP transmission scheduler
//! ("reconsideration"), and the [`Session`] facade that glues them
//! together, per [RFC 3550](https://www.rfc-editor.org/rfc/rfc3550).
//!
//! This crate is single-threaded and cooperative: every [`Session`]
//! method runs synchronously to completion with no internal suspension
//! points, and nothing here spawns a thread or reads a system clock.
//! Wrapping a [`Session`] in a lock or actor, and driving it from a
//! reactor that owns the real clock and socket, is the embedder's job.

pub mod collaborators;
pub mod membership;
pub mod scheduler;
pub mod session;
pub mod source;

pub use session::{Session, SessionOptions, SessionState};
