//! Uptime clock: epoch anchor, tick-to-calendar conversion, and NTP
//! exchange processing
//!
//! An [`UptimeClock`] pairs a [`TickSource`] with the single mutable piece
//! of synchronization state: one anchor associating a tick value with a
//! calendar time. All anchor access happens inside a critical section so a
//! conversion never observes a half-updated anchor, even with tick-overflow
//! interrupts firing underneath it.
//!
//! Once a conversion fails era resolution the anchor is treated as stale
//! for every later query until it is re-established. Staleness here is
//! geometric (circular tick distance), not wall-clock: an anchor inside the
//! validity window never expires by mere passage of time.

use core::cell::RefCell;

use critical_section::Mutex;
use hal_abstractions::TickSource;

use crate::era::era_of;
use crate::ntp::{NtpDuration, NtpTimestamp, Timeval};
use crate::packet::NtpPacketHeader;

/// Synchronization and protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EpochError {
    /// No epoch anchor has been established, or the last query fell outside
    /// the validity window. Time is currently unknown.
    EpochInvalid,
    /// An NTP response failed the stratum/timestamp/echo sanity checks and
    /// must be discarded.
    ProtocolRejected,
}

impl core::fmt::Display for EpochError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EpochInvalid => write!(f, "epoch not valid"),
            Self::ProtocolRejected => write!(f, "NTP response rejected"),
        }
    }
}

impl core::error::Error for EpochError {}

/// Result of processing one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NtpExchange {
    /// Recommended clock correction in NTP fixed-point units. Positive
    /// means the local clock is behind the server.
    pub offset: NtpDuration,
    /// The correction in milliseconds, saturated to the `i32` range.
    pub offset_ms: i32,
    /// Round-trip delay in microseconds with server processing time
    /// subtracted, saturated to the `u32` range.
    pub rtt_us: u32,
}

/// The epoch anchor. The three anchor fields always describe the same
/// instant and are only ever updated together.
struct EpochState {
    valid: bool,
    anchor_tick: u32,
    anchor_ntp: NtpTimestamp,
    anchor_timeval: Timeval,
    /// ceil(log2 frequency); the NTP precision field is its negation.
    precision_bits: u8,
    /// Tick rate cached when the anchor was established; re-read only on an
    /// explicit resume notification.
    frequency_hz: u32,
}

/// Calendar-time view over a wrapping tick counter.
pub struct UptimeClock<T: TickSource> {
    source: T,
    state: Mutex<RefCell<EpochState>>,
}

impl<T: TickSource> UptimeClock<T> {
    /// A clock with no epoch learned yet. Conversions fail with
    /// [`EpochError::EpochInvalid`] until an epoch is set.
    pub fn new(source: T) -> Self {
        let frequency_hz = source.frequency_hz();
        UptimeClock {
            source,
            state: Mutex::new(RefCell::new(EpochState {
                valid: false,
                anchor_tick: 0,
                anchor_ntp: NtpTimestamp::ZERO,
                anchor_timeval: Timeval::new(0, 0),
                precision_bits: precision_bits(frequency_hz),
                frequency_hz,
            })),
        }
    }

    /// The tick source backing this clock.
    pub fn source(&self) -> &T {
        &self.source
    }

    /// Cached conversion frequency in ticks per second.
    pub fn frequency_hz(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow(cs).borrow().frequency_hz)
    }

    /// Establish the epoch from a POSIX instant observed at `at_tick`.
    ///
    /// `at_tick` is a tick captured "now" by the caller (for example the
    /// receipt tick of a time message); no era resolution is applied to it.
    /// Always succeeds and clears any latched invalidation.
    pub fn set_from_timeval(&self, tv: Timeval, at_tick: u32) {
        let now = self.source.now();
        let frequency_hz = self.source.frequency_hz();
        let elapsed = now as i64 - at_tick as i64;
        let anchor_ntp =
            NtpTimestamp::from_timeval(tv) + NtpDuration::from_ticks(elapsed, frequency_hz);
        self.anchor(now, anchor_ntp, frequency_hz);
    }

    /// Establish the epoch from an NTP timestamp corresponding to the
    /// current tick. Always succeeds.
    pub fn set_from_ntp(&self, ntp: NtpTimestamp) {
        let now = self.source.now();
        let frequency_hz = self.source.frequency_hz();
        self.anchor(now, ntp, frequency_hz);
    }

    /// Shift the epoch by `delta` and re-anchor it at the current tick.
    ///
    /// Elapsed time since the previous anchor still flows into the new one;
    /// only the correction moves it. Fails when no anchor exists or the
    /// current tick can no longer be resolved against it.
    pub fn adjust_from_ntp(&self, delta: NtpDuration) -> Result<(), EpochError> {
        let now = self.source.now();
        critical_section::with(|cs| {
            let mut st = self.state.borrow(cs).borrow_mut();
            if !st.valid {
                return Err(EpochError::EpochInvalid);
            }
            let Some(era) = era_of(st.anchor_tick, now) else {
                st.valid = false;
                return Err(EpochError::EpochInvalid);
            };
            let elapsed = now as i64 - st.anchor_tick as i64 + era.ticks_offset();
            let ntp =
                st.anchor_ntp + NtpDuration::from_ticks(elapsed, st.frequency_hz) + delta;
            st.anchor_tick = now;
            st.anchor_ntp = ntp;
            st.anchor_timeval = ntp.as_timeval();
            Ok(())
        })?;
        #[cfg(feature = "defmt")]
        defmt::debug!("epoch adjusted by {=i64} ntp units", delta.as_fixed());
        Ok(())
    }

    fn anchor(&self, tick: u32, ntp: NtpTimestamp, frequency_hz: u32) {
        critical_section::with(|cs| {
            let mut st = self.state.borrow(cs).borrow_mut();
            st.valid = true;
            st.anchor_tick = tick;
            st.anchor_ntp = ntp;
            st.anchor_timeval = ntp.as_timeval();
            st.precision_bits = precision_bits(frequency_hz);
            st.frequency_hz = frequency_hz;
        });
        #[cfg(feature = "defmt")]
        defmt::info!("epoch set at tick {=u32}", tick);
    }

    /// Whether an epoch anchor is currently trusted.
    pub fn check_validity(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).borrow().valid)
    }

    /// Discard the epoch anchor. Conversions fail until a new one is set.
    pub fn invalidate(&self) {
        critical_section::with(|cs| {
            self.state.borrow(cs).borrow_mut().valid = false;
        });
        #[cfg(feature = "defmt")]
        defmt::warn!("epoch invalidated");
    }

    /// Notification that the tick source was suspended and resumed.
    ///
    /// The conversion frequency may have changed, which makes any standing
    /// anchor meaningless: drop it and re-cache the frequency-derived state.
    pub fn on_tick_source_resumed(&self) {
        let frequency_hz = self.source.frequency_hz();
        critical_section::with(|cs| {
            let mut st = self.state.borrow(cs).borrow_mut();
            st.valid = false;
            st.frequency_hz = frequency_hz;
            st.precision_bits = precision_bits(frequency_hz);
        });
        #[cfg(feature = "defmt")]
        defmt::warn!("tick source resumed; epoch invalidated");
    }

    /// The tick at which the anchor was last established, if one is valid.
    pub fn last_update_tick(&self) -> Option<u32> {
        critical_section::with(|cs| {
            let st = self.state.borrow(cs).borrow();
            st.valid.then_some(st.anchor_tick)
        })
    }

    /// Signed ticks elapsed from the anchor to `at_tick`, era-folded.
    ///
    /// Unlike the conversions this does not latch invalidation on an
    /// unresolvable tick; it only reports it.
    pub fn age(&self, at_tick: u32) -> Result<i32, EpochError> {
        critical_section::with(|cs| {
            let st = self.state.borrow(cs).borrow();
            if !st.valid {
                return Err(EpochError::EpochInvalid);
            }
            crate::era::tick_age(st.anchor_tick, at_tick).ok_or(EpochError::EpochInvalid)
        })
    }

    /// Convert a tick to a POSIX `(seconds, microseconds)` instant.
    ///
    /// An unresolvable tick invalidates the anchor before failing: one
    /// stale query means the anchor can no longer be trusted for any query.
    pub fn to_timeval(&self, tick: u32) -> Result<Timeval, EpochError> {
        critical_section::with(|cs| {
            let mut st = self.state.borrow(cs).borrow_mut();
            let era = resolve_era(&mut st, tick)?;
            let elapsed = tick as i64 - st.anchor_tick as i64 + era.ticks_offset();
            let delta_us = (elapsed * 1_000_000).div_euclid(st.frequency_hz as i64);
            Ok(st.anchor_timeval.offset_by_micros(delta_us))
        })
    }

    /// Convert a tick to an NTP timestamp.
    ///
    /// With `bypass_validation` set, an unresolvable or missing anchor is
    /// replaced by the fixed fallback epoch ([`NtpTimestamp::POSIX_EPOCH`]
    /// at tick zero), producing a self-consistent though not globally
    /// meaningful timestamp. That keeps the very first outgoing request
    /// constructible before any synchronization has happened.
    pub fn to_ntp(&self, tick: u32, bypass_validation: bool) -> Result<NtpTimestamp, EpochError> {
        critical_section::with(|cs| {
            let mut st = self.state.borrow(cs).borrow_mut();
            match resolve_era(&mut st, tick) {
                Ok(era) => {
                    let elapsed = tick as i64 - st.anchor_tick as i64 + era.ticks_offset();
                    Ok(st.anchor_ntp + NtpDuration::from_ticks(elapsed, st.frequency_hz))
                }
                Err(_) if bypass_validation => Ok(NtpTimestamp::POSIX_EPOCH
                    + NtpDuration::from_ticks(tick as i64, st.frequency_hz)),
                Err(e) => Err(e),
            }
        })
    }

    /// Convert a tick to whole POSIX seconds.
    pub fn to_posix_time(&self, tick: u32) -> Result<i64, EpochError> {
        self.to_timeval(tick).map(|tv| tv.sec)
    }

    /// Build an outgoing client request stamped at `local_tick`.
    ///
    /// Usable before any epoch is learned; the transmit timestamp then
    /// derives from the fallback epoch.
    pub fn build_request(&self, local_tick: u32) -> NtpPacketHeader {
        let precision =
            critical_section::with(|cs| self.state.borrow(cs).borrow().precision_bits);
        let mut pkt = NtpPacketHeader::client_request(-(precision as i8));
        pkt.transmit = match self.to_ntp(local_tick, true) {
            Ok(ntp) => ntp,
            // Unreachable with bypass set; keep the request sendable anyway.
            Err(_) => NtpTimestamp::POSIX_EPOCH,
        };
        pkt
    }
}

/// Era-resolve `tick` against the anchor, latching invalidation on failure.
fn resolve_era(st: &mut EpochState, tick: u32) -> Result<crate::era::Era, EpochError> {
    if !st.valid {
        return Err(EpochError::EpochInvalid);
    }
    match era_of(st.anchor_tick, tick) {
        Some(era) => Ok(era),
        None => {
            st.valid = false;
            Err(EpochError::EpochInvalid)
        }
    }
}

/// Smallest number of bits covering one second of ticks: ceil(log2 rate).
fn precision_bits(frequency_hz: u32) -> u8 {
    (32 - frequency_hz.saturating_sub(1).leading_zeros()) as u8
}

/// Process a matched NTP request/response exchange.
///
/// `request` is the packet whose transmit timestamp the response should
/// echo; pass `None` when it is unavailable, which skips the echo check.
/// `local_receipt` is the local NTP-domain timestamp captured when the
/// response arrived (see [`UptimeClock::to_ntp`]).
///
/// Purely functional: the caller decides whether to feed the offset back
/// through [`UptimeClock::set_from_ntp`] or [`UptimeClock::adjust_from_ntp`].
pub fn process_response(
    request: Option<&NtpPacketHeader>,
    response: &NtpPacketHeader,
    local_receipt: NtpTimestamp,
) -> Result<NtpExchange, EpochError> {
    // A stratum-0 packet is a kiss-of-death or unsynchronized server.
    if response.stratum == 0 || response.transmit == NtpTimestamp::ZERO {
        return Err(EpochError::ProtocolRejected);
    }
    if let Some(request) = request {
        // The echoed originate timestamp must match our transmit timestamp
        // exactly, or the response is stale or forged.
        if request.transmit == NtpTimestamp::ZERO || response.originate != request.transmit {
            return Err(EpochError::ProtocolRejected);
        }
    }

    let t1 = response.originate;
    let t2 = response.receive;
    let t3 = response.transmit;
    let t4 = local_receipt;

    let offset = ((t2 - t1) + (t3 - t4)) / 2;
    let delay = (t4 - t1) - (t3 - t2);

    Ok(NtpExchange {
        offset,
        offset_ms: offset.as_millis_saturating(),
        rtt_us: delay.as_micros_saturating(),
    })
}
