//! Era classification for the wrapping tick counter
//!
//! The 32-bit tick counter wraps every 2^32 ticks; one full cycle is an
//! "era". Given a single stored anchor tick, a nearby query tick can be
//! placed in the era before, the same era as, or the era after the anchor —
//! as long as the circular distance between the two stays inside the
//! validity window. Beyond the window the relationship is indeterminate:
//! "barely wrapped forward" and "barely wrapped backward" become
//! indistinguishable, so the classification is refused rather than guessed.

/// Ticks in one full wrap of the counter.
pub const ERA_TICKS: u64 = 1 << 32;

const HALF_ERA: u32 = 0x8000_0000;

/// Maximum circular distance (in ticks) a query may be from the anchor
/// before era classification is refused.
///
/// Three-eighths of an era on either side. The remaining quarter era around
/// the exact half-era point is a deliberate dead zone; see the module docs.
pub const VALIDITY_WINDOW: u32 = 0x6000_0000;

/// Which era a query tick falls in, relative to an anchor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Era {
    /// The query precedes the anchor's era: the counter wrapped between
    /// the query and the anchor.
    Previous,
    /// Query and anchor lie in the same era.
    Same,
    /// The query follows the anchor's era: the counter wrapped between
    /// the anchor and the query.
    Next,
}

impl Era {
    /// Correction to add to a plain numeric tick difference so that it
    /// spans the wrap correctly.
    pub const fn ticks_offset(self) -> i64 {
        match self {
            Era::Previous => -(ERA_TICKS as i64),
            Era::Same => 0,
            Era::Next => ERA_TICKS as i64,
        }
    }
}

/// Classify `query` relative to `anchor`.
///
/// Returns `None` when the circular distance between the two is at least
/// [`VALIDITY_WINDOW`]; callers must treat that as a hard failure, never as
/// [`Era::Same`].
pub fn era_of(anchor: u32, query: u32) -> Option<Era> {
    let behind = anchor.wrapping_sub(query);
    if behind < HALF_ERA {
        // Query is circularly at or before the anchor.
        if behind >= VALIDITY_WINDOW {
            None
        } else if query > anchor {
            // Numerically larger yet circularly earlier: the query sits at
            // the end of the previous era.
            Some(Era::Previous)
        } else {
            Some(Era::Same)
        }
    } else {
        // Query is circularly after the anchor.
        let ahead = query.wrapping_sub(anchor);
        if ahead >= VALIDITY_WINDOW {
            None
        } else if query < anchor {
            Some(Era::Next)
        } else {
            Some(Era::Same)
        }
    }
}

/// Signed tick distance from `anchor` to `query`, folding a full era for
/// queries that wrapped. Defined exactly where [`era_of`] is.
pub fn tick_age(anchor: u32, query: u32) -> Option<i32> {
    // Within the validity window the true distance is below 2^31 in
    // magnitude, so the two's-complement reinterpretation of the wrapped
    // difference is exactly the era-folded distance.
    era_of(anchor, query).map(|_| query.wrapping_sub(anchor) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EIGHTH_ERA: u32 = 0x2000_0000;
    const QUARTER_ERA: u32 = 0x4000_0000;

    #[test]
    fn anchor_is_its_own_era() {
        for anchor in [0, EIGHTH_ERA, HALF_ERA, u32::MAX] {
            assert_eq!(era_of(anchor, anchor), Some(Era::Same));
        }
    }

    #[test]
    fn window_boundaries() {
        let anchor = HALF_ERA;
        assert_eq!(
            era_of(anchor, anchor + (VALIDITY_WINDOW - 1)),
            Some(Era::Same)
        );
        assert_eq!(
            era_of(anchor, anchor - (VALIDITY_WINDOW - 1)),
            Some(Era::Same)
        );
        assert_eq!(era_of(anchor, anchor + VALIDITY_WINDOW), None);
        assert_eq!(era_of(anchor, anchor - VALIDITY_WINDOW), None);
        // The dead zone covers everything out to the half-era point.
        assert_eq!(era_of(anchor, anchor.wrapping_add(HALF_ERA - 1)), None);
        assert_eq!(era_of(anchor, 0), None);
    }

    #[test]
    fn previous_era_near_counter_start() {
        // Anchor shortly after a wrap: ticks near the counter maximum are
        // the tail of the previous era.
        let anchor = EIGHTH_ERA;
        assert_eq!(era_of(anchor, u32::MAX), Some(Era::Previous));
        assert_eq!(era_of(anchor, 0u32.wrapping_sub(EIGHTH_ERA)), Some(Era::Previous));
        assert_eq!(
            era_of(anchor, 0u32.wrapping_sub(QUARTER_ERA - 1)),
            Some(Era::Previous)
        );
        assert_eq!(era_of(anchor, 0u32.wrapping_sub(QUARTER_ERA)), None);
        assert_eq!(era_of(anchor, QUARTER_ERA), Some(Era::Same));
        assert_eq!(era_of(anchor, 0), Some(Era::Same));
    }

    #[test]
    fn next_era_near_counter_end() {
        // Anchor shortly before a wrap: small tick values are the start of
        // the next era.
        let anchor = HALF_ERA + QUARTER_ERA + EIGHTH_ERA;
        assert_eq!(era_of(anchor, 0), Some(Era::Next));
        assert_eq!(era_of(anchor, EIGHTH_ERA), Some(Era::Next));
        assert_eq!(
            era_of(anchor, anchor.wrapping_add(VALIDITY_WINDOW - 1)),
            Some(Era::Next)
        );
        assert_eq!(era_of(anchor, anchor.wrapping_add(VALIDITY_WINDOW)), None);
        assert_eq!(era_of(anchor, u32::MAX), Some(Era::Same));
        assert_eq!(era_of(anchor, anchor - VALIDITY_WINDOW), None);
    }

    #[test]
    fn ticks_offset_folds_one_era() {
        assert_eq!(Era::Previous.ticks_offset(), -(1i64 << 32));
        assert_eq!(Era::Same.ticks_offset(), 0);
        assert_eq!(Era::Next.ticks_offset(), 1i64 << 32);
    }

    #[test]
    fn age_folds_eras() {
        let anchor = EIGHTH_ERA;
        assert_eq!(tick_age(anchor, anchor), Some(0));
        assert_eq!(
            tick_age(anchor, anchor + QUARTER_ERA),
            Some(QUARTER_ERA as i32)
        );
        // Three-quarters of an era ahead is circularly a quarter era behind.
        assert_eq!(
            tick_age(anchor, anchor.wrapping_add(HALF_ERA + QUARTER_ERA)),
            Some(-(QUARTER_ERA as i32))
        );
        assert_eq!(tick_age(anchor, anchor.wrapping_add(HALF_ERA)), None);
    }
}
