//! Hash slot model for sharded clusters.
//!
//! Slot ownership is reported by the member table as a space-separated slot
//! spec per primary. This module turns those specs into [`SlotRange`] values
//! and checks whether the primaries of a cluster cover the full slot space.
//!
//! ## Module Structure
//!
//! - [`range`]: `SlotRange` and slot spec parsing
//! - [`coverage`]: Slot coverage accounting across primaries

pub mod coverage;
pub mod range;

pub use coverage::SlotCoverage;
pub use range::{SlotRange, TOTAL_SLOTS, format_slot_ranges, parse_slot_spec};
