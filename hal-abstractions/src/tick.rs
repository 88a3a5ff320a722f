//! Free-running tick counter abstraction

/// A free-running, wrapping 32-bit tick counter.
///
/// Board support packages implement this over a hardware timer extended by
/// an interrupt-driven overflow counter. The counter increases monotonically
/// except for a wrap back to zero every 2^32 ticks; consumers that need
/// calendar time must re-anchor against an external reference more often
/// than the wrap period.
pub trait TickSource {
    /// Current counter value.
    fn now(&self) -> u32;

    /// Counter rate in ticks per second. Always positive.
    ///
    /// Changes only when the underlying timer is reconfigured (for example
    /// across a suspend/resume of the board); consumers learn about that
    /// through an explicit resume notification, never by polling.
    fn frequency_hz(&self) -> u32;
}

impl<T: TickSource> TickSource for &T {
    fn now(&self) -> u32 {
        (*self).now()
    }

    fn frequency_hz(&self) -> u32 {
        (*self).frequency_hz()
    }
}
