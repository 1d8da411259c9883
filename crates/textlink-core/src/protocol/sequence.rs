//! Frame sequence numbering.
//!
//! Every frame written to the channel carries a monotonically increasing
//! sequence number in its header. The host uses it purely for diagnostics
//! (spotting drops or reordering in a capture); nothing on the client blocks
//! on it.
//!
//! Two call sites stamp frames on the same channel: the connect-time
//! `Initialized` handshake and the writer loop. The counter is a single
//! `AtomicU64` so both can draw numbers without a lock, and a reconnect does
//! not restart the numbering, so a capture spanning several host restarts
//! stays totally ordered.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter handing out one sequence number per frame.
///
/// Numbering starts at 0 and increments by 1 per [`next`]; at `u64::MAX` it
/// wraps back to 0 rather than panicking. At one frame per focus event the
/// wrap is unreachable in practice, but the header field is fixed-width and
/// the decoder accepts any value, so the counter follows suit.
///
/// # Examples
///
/// ```rust
/// use textlink_core::protocol::SequenceCounter;
///
/// let seq = SequenceCounter::new();
/// let handshake_frame_no = seq.next();
/// let first_event_frame_no = seq.next();
/// assert!(first_event_frame_no > handshake_frame_no);
/// ```
///
/// [`next`]: SequenceCounter::next
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first frame will be number 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Claims the next sequence number.
    ///
    /// `Ordering::Relaxed` is sufficient: the numbers only label frames and
    /// carry no synchronisation between the paths drawing them.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Peeks at the number the next frame would get, without claiming it.
    ///
    /// Diagnostic only; another path may claim it before the caller acts.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
