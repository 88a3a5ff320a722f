//! NTP fixed-point timestamp arithmetic
//!
//! An NTP timestamp is a 64-bit fixed-point value: 32 bits of whole seconds
//! since 1900-01-01T00:00:00Z and 32 bits of binary fraction. Differences
//! between timestamps are signed 64-bit values in the same 2^-32-second
//! unit. Subtraction wraps, so two timestamps always yield the difference
//! whose magnitude is smallest, and additions of durations roll over the
//! NTP era boundary transparently.

use core::ops::{Add, Div, Sub};

/// Seconds between the NTP epoch (1900-01-01) and the POSIX epoch
/// (1970-01-01).
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const MICROS_PER_SEC: i64 = 1_000_000;

/// A 64-bit fixed-point NTP timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    /// The all-zero timestamp, which the protocol treats as "unset".
    pub const ZERO: NtpTimestamp = NtpTimestamp(0);

    /// The POSIX epoch expressed as an NTP timestamp. Used as the fallback
    /// epoch for timestamps generated before any synchronization.
    pub const POSIX_EPOCH: NtpTimestamp = NtpTimestamp(NTP_UNIX_OFFSET << 32);

    /// Wrap a raw 32.32 fixed-point value.
    pub const fn from_fixed(bits: u64) -> Self {
        NtpTimestamp(bits)
    }

    /// The raw 32.32 fixed-point value.
    pub const fn as_fixed(self) -> u64 {
        self.0
    }

    /// Read a big-endian wire representation.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        NtpTimestamp(u64::from_be_bytes(bytes))
    }

    /// Big-endian wire representation.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Convert a POSIX `(seconds, microseconds)` pair.
    pub fn from_timeval(tv: Timeval) -> Self {
        let secs = (tv.sec + NTP_UNIX_OFFSET as i64) as u64;
        let frac = ((tv.usec as u64) << 32) / MICROS_PER_SEC as u64;
        NtpTimestamp(secs.wrapping_shl(32).wrapping_add(frac))
    }

    /// Convert to a POSIX `(seconds, microseconds)` pair.
    ///
    /// The fraction is rounded to the nearest microsecond, which makes this
    /// the exact inverse of [`NtpTimestamp::from_timeval`].
    pub fn as_timeval(self) -> Timeval {
        let mut sec = (self.0 >> 32) as i64 - NTP_UNIX_OFFSET as i64;
        let frac = self.0 & 0xFFFF_FFFF;
        let mut usec = ((frac * MICROS_PER_SEC as u64 + (1 << 31)) >> 32) as u32;
        if usec >= 1_000_000 {
            sec += 1;
            usec -= 1_000_000;
        }
        Timeval { sec, usec }
    }
}

impl Sub for NtpTimestamp {
    type Output = NtpDuration;

    fn sub(self, rhs: Self) -> NtpDuration {
        // Wrapping subtraction reinterpreted as signed picks whichever NTP
        // eras of the two timestamps minimize the difference.
        NtpDuration(self.0.wrapping_sub(rhs.0) as i64)
    }
}

impl Add<NtpDuration> for NtpTimestamp {
    type Output = NtpTimestamp;

    fn add(self, rhs: NtpDuration) -> NtpTimestamp {
        NtpTimestamp(self.0.wrapping_add(rhs.0 as u64))
    }
}

impl Sub<NtpDuration> for NtpTimestamp {
    type Output = NtpTimestamp;

    fn sub(self, rhs: NtpDuration) -> NtpTimestamp {
        NtpTimestamp(self.0.wrapping_sub(rhs.0 as u64))
    }
}

/// A signed span of time in NTP fixed-point units (2^-32 seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NtpDuration(i64);

impl NtpDuration {
    pub const ZERO: NtpDuration = NtpDuration(0);

    /// Wrap a raw signed fixed-point value.
    pub const fn from_fixed(units: i64) -> Self {
        NtpDuration(units)
    }

    /// The raw signed fixed-point value.
    pub const fn as_fixed(self) -> i64 {
        self.0
    }

    /// A whole number of seconds.
    pub const fn from_secs(secs: i32) -> Self {
        NtpDuration((secs as i64) << 32)
    }

    /// The span covered by a signed tick count at the given tick rate.
    pub fn from_ticks(ticks: i64, frequency_hz: u32) -> Self {
        // ticks << 32 can exceed 63 bits for multi-era spans; widen first.
        NtpDuration((((ticks as i128) << 32) / frequency_hz as i128) as i64)
    }

    /// Milliseconds, truncated toward negative infinity and saturated to
    /// the `i32` range instead of wrapping.
    pub fn as_millis_saturating(self) -> i32 {
        let ms = (self.0 as i128 * 1000) >> 32;
        ms.clamp(i32::MIN as i128, i32::MAX as i128) as i32
    }

    /// Microseconds, saturated to the `u32` range: negative spans clamp to
    /// zero, oversized spans to `u32::MAX`.
    pub fn as_micros_saturating(self) -> u32 {
        let us = (self.0 as i128 * 1_000_000) >> 32;
        us.clamp(0, u32::MAX as i128) as u32
    }
}

impl Add for NtpDuration {
    type Output = NtpDuration;

    fn add(self, rhs: Self) -> NtpDuration {
        // Saturation keeps two large spans from silently cancelling.
        NtpDuration(self.0.saturating_add(rhs.0))
    }
}

impl Sub for NtpDuration {
    type Output = NtpDuration;

    fn sub(self, rhs: Self) -> NtpDuration {
        NtpDuration(self.0.saturating_sub(rhs.0))
    }
}

impl Div<i32> for NtpDuration {
    type Output = NtpDuration;

    fn div(self, rhs: i32) -> NtpDuration {
        NtpDuration(self.0 / rhs as i64)
    }
}

/// A POSIX `(seconds, microseconds)` instant.
///
/// `usec` is always normalized into `[0, 1_000_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeval {
    /// Whole seconds since 1970-01-01T00:00:00Z.
    pub sec: i64,
    /// Microseconds into the second.
    pub usec: u32,
}

impl Timeval {
    pub const fn new(sec: i64, usec: u32) -> Self {
        Timeval { sec, usec }
    }

    /// This instant shifted by a signed number of microseconds, with the
    /// microsecond field renormalized into `[0, 1_000_000)`.
    pub fn offset_by_micros(self, delta_us: i64) -> Timeval {
        let total = self.sec * MICROS_PER_SEC + self.usec as i64 + delta_us;
        Timeval {
            sec: total.div_euclid(MICROS_PER_SEC),
            usec: total.rem_euclid(MICROS_PER_SEC) as u32,
        }
    }
}
