//! Platform-agnostic uptime-to-calendar time synchronization
//!
//! This crate extends a free-running, wrapping 32-bit tick counter (supplied
//! by a board support crate through [`hal_abstractions::TickSource`]) into
//! unambiguous calendar time, and implements the client-side arithmetic of
//! the NTP on-wire protocol: building request timestamps and turning one
//! request/response exchange into a recommended clock offset and round-trip
//! delay.
//!
//! It has NO hardware dependencies. All shared state lives in a single
//! [`UptimeClock`] instance guarded by `critical-section`, so conversions
//! stay consistent with respect to interrupt-context tick overflow handling.
//!
//! Network transport, server selection, and retry policy belong to the
//! caller; this crate only interprets packet fields already in memory.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod era;
pub mod ntp;
pub mod packet;
pub mod text;

pub use clock::{process_response, EpochError, NtpExchange, UptimeClock};
pub use era::{era_of, tick_age, Era, VALIDITY_WINDOW};
pub use ntp::{NtpDuration, NtpTimestamp, Timeval};
pub use packet::NtpPacketHeader;
pub use text::uptime_text;
