//! Slot ranges and slot spec parsing.
//!
//! A slot spec is the tail of a `CLUSTER NODES` row: whitespace-separated
//! tokens that are either a single slot (`5461`) or an inclusive range
//! (`0-5460`). Tokens in brackets describe slots being imported or migrated
//! and are not owned by the node.

use serde::Serialize;

use crate::error::ParseError;

/// Total number of hash slots in a Valkey cluster.
pub const TOTAL_SLOTS: u16 = 16384;

/// A contiguous range of hash slots [start, end] inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SlotRange {
    /// Start of the slot range (inclusive).
    pub start: u16,
    /// End of the slot range (inclusive).
    pub end: u16,
}

impl SlotRange {
    /// Create a validated slot range.
    pub fn new(start: u16, end: u16) -> Result<Self, ParseError> {
        if start > end {
            return Err(ParseError::InvalidSlotRange(format!(
                "start {} is greater than end {}",
                start, end
            )));
        }
        if end >= TOTAL_SLOTS {
            return Err(ParseError::InvalidSlotRange(format!(
                "slot {} is outside 0-{}",
                end,
                TOTAL_SLOTS - 1
            )));
        }
        Ok(Self { start, end })
    }

    /// Create a single-slot range.
    pub fn single(slot: u16) -> Result<Self, ParseError> {
        Self::new(slot, slot)
    }

    /// Number of slots in this range.
    pub fn count(&self) -> u32 {
        u32::from(self.end - self.start) + 1
    }

    /// Check if this range contains a specific slot.
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Iterate over all slots in this range.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }

    /// Parse one slot spec token (`"5461"` or `"0-5460"`).
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let token = token.trim();
        match token.split_once('-') {
            Some((start, end)) => Self::new(parse_slot(start, token)?, parse_slot(end, token)?),
            None => Self::single(parse_slot(token, token)?),
        }
    }
}

fn parse_slot(number: &str, token: &str) -> Result<u16, ParseError> {
    number
        .parse()
        .map_err(|_| ParseError::InvalidSlotRange(format!("invalid slot token: {}", token)))
}

impl std::fmt::Display for SlotRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}-{}]", self.start, self.end)
    }
}

/// Parse a member table slot spec into owned slot ranges.
///
/// Blank input yields an empty list. Migration markers such as
/// `[93-<-292f8b36...]` are skipped. Any other malformed token fails the
/// whole spec.
pub fn parse_slot_spec(spec: &str) -> Result<Vec<SlotRange>, ParseError> {
    spec.split_whitespace()
        .filter(|token| !token.starts_with('['))
        .map(SlotRange::parse)
        .collect()
}

/// Render ranges compactly: `"[0-5460] [5461-5461]"`, or `"[]"` when empty.
pub fn format_slot_ranges(ranges: &[SlotRange]) -> String {
    if ranges.is_empty() {
        return "[]".to_string();
    }
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
