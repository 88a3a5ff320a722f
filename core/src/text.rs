//! Human-readable uptime rendering

use core::fmt::Write;

use heapless::String;

/// Longest rendering: "1193:02:47.295" for the full counter range at 1 kHz.
pub const UPTIME_TEXT_LEN: usize = 16;

/// Render a tick count as elapsed time with millisecond resolution.
///
/// Durations of an hour or more render as `H:MM:SS.mmm`; shorter ones as
/// `MM:SS.mmm` with the minutes field space-padded to two columns so
/// successive lines stay aligned.
pub fn uptime_text(ticks: u32, frequency_hz: u32) -> String<UPTIME_TEXT_LEN> {
    let total_ms = if frequency_hz == 0 {
        0
    } else {
        ticks as u64 * 1_000 / frequency_hz as u64
    };
    let ms = total_ms % 1_000;
    let total_s = total_ms / 1_000;
    let s = total_s % 60;
    let total_min = total_s / 60;
    let min = total_min % 60;
    let hours = total_min / 60;

    let mut out = String::new();
    // String<16> always has room for the widest rendering.
    if hours > 0 {
        let _ = write!(out, "{}:{:02}:{:02}.{:03}", hours, min, s, ms);
    } else {
        let _ = write!(out, "{:2}:{:02}.{:03}", min, s, ms);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREQ: u32 = 32_768;

    #[test]
    fn sub_hour_format() {
        assert_eq!(uptime_text(0, FREQ).as_str(), " 0:00.000");
        assert_eq!(uptime_text(FREQ, FREQ).as_str(), " 0:01.000");
        // 61.5 seconds
        assert_eq!(uptime_text(FREQ * 61 + FREQ / 2, FREQ).as_str(), " 1:01.500");
        assert_eq!(uptime_text(FREQ * 59 * 60, FREQ).as_str(), "59:00.000");
    }

    #[test]
    fn hour_format() {
        assert_eq!(uptime_text(FREQ * 3_600, FREQ).as_str(), "1:00:00.000");
        assert_eq!(
            uptime_text(FREQ * (3_600 + 62) + FREQ / 4, FREQ).as_str(),
            "1:01:02.250"
        );
    }

    #[test]
    fn full_counter_range() {
        // 2^32 - 1 ticks at 32 kiHz is a bit over 36 hours.
        assert_eq!(uptime_text(u32::MAX, FREQ).as_str(), "36:24:31.999");
    }

    #[test]
    fn millisecond_truncation() {
        // 32 ticks is 0.9765... ms; truncated, not rounded.
        assert_eq!(uptime_text(32, FREQ).as_str(), " 0:00.000");
        assert_eq!(uptime_text(33, FREQ).as_str(), " 0:00.001");
    }

    #[test]
    fn zero_frequency_renders_zero() {
        assert_eq!(uptime_text(12_345, 0).as_str(), " 0:00.000");
    }
}
