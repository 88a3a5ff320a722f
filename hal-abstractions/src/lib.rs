//! Hardware abstraction traits for board support crates
//!
//! Board support packages implement these traits over their hardware
//! timers; the platform-agnostic crates consume them and stay free of
//! any device dependency.

#![no_std]
#![deny(unsafe_code)]

pub mod tick;

pub use tick::TickSource;
