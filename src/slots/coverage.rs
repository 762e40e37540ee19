//! Slot coverage accounting across the primaries of a cluster.

use serde::Serialize;

use super::range::{SlotRange, TOTAL_SLOTS};

/// How well a set of primaries covers the slot space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotCoverage {
    /// Sum of range counts over every primary.
    pub assigned: u32,
    /// Number of distinct slots owned by at least one primary.
    pub distinct: u32,
}

impl SlotCoverage {
    /// Account for every range of every primary.
    pub fn from_ranges<'a>(ranges: impl IntoIterator<Item = &'a SlotRange>) -> Self {
        let mut seen = vec![false; usize::from(TOTAL_SLOTS)];
        let mut assigned = 0;
        let mut distinct = 0;
        for range in ranges {
            assigned += range.count();
            for slot in range.iter() {
                if let Some(flag) = seen.get_mut(usize::from(slot))
                    && !*flag
                {
                    *flag = true;
                    distinct += 1;
                }
            }
        }
        Self { assigned, distinct }
    }

    /// Every slot is owned exactly once.
    pub fn is_complete(&self) -> bool {
        self.assigned == u32::from(TOTAL_SLOTS) && self.distinct == u32::from(TOTAL_SLOTS)
    }

    /// Slots claimed by more than one primary.
    pub fn duplicated(&self) -> u32 {
        self.assigned - self.distinct
    }

    /// Slots owned by no primary.
    pub fn missing(&self) -> u32 {
        u32::from(TOTAL_SLOTS) - self.distinct
    }
}
