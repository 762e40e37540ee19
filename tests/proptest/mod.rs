// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for valkey-fleet.
//!
//! Uses proptest to generate random inputs and verify invariants.

use proptest::prelude::*;

use valkey_fleet::client::parsing::{parse_info_block, parse_member_table};
use valkey_fleet::selector::Target;
use valkey_fleet::slots::{SlotCoverage, SlotRange, TOTAL_SLOTS, format_slot_ranges, parse_slot_spec};

/// Strategy for one slot spec token: a single slot or an ascending range.
fn slot_token() -> impl Strategy<Value = (String, u32)> {
    prop_oneof![
        (0..TOTAL_SLOTS).prop_map(|slot| (slot.to_string(), 1)),
        (0..TOTAL_SLOTS, 0..TOTAL_SLOTS).prop_map(|(a, b)| {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            (
                format!("{}-{}", start, end),
                u32::from(end) - u32::from(start) + 1,
            )
        }),
    ]
}

/// Strategy for info field names.
fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,20}"
}

/// Strategy for info field values; may contain colons.
fn field_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9=,.:_-]{0,30}"
}

proptest! {
    /// Property: the parsed ranges count exactly the slots the spec names.
    #[test]
    fn test_slot_spec_count_matches_tokens(tokens in prop::collection::vec(slot_token(), 0..20)) {
        let spec = tokens.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>().join(" ");
        let expected: u32 = tokens.iter().map(|(_, count)| count).sum();

        let ranges = parse_slot_spec(&spec).unwrap();

        prop_assert_eq!(ranges.len(), tokens.len());
        prop_assert_eq!(ranges.iter().map(SlotRange::count).sum::<u32>(), expected);
    }

    /// Property: whitespace-only specs parse to nothing.
    #[test]
    fn test_blank_slot_spec_is_empty(spec in "[ \t]{0,10}") {
        prop_assert!(parse_slot_spec(&spec).unwrap().is_empty());
    }

    /// Property: rendered ranges parse back once brackets are removed.
    #[test]
    fn test_formatted_ranges_reparse(tokens in prop::collection::vec(slot_token(), 1..10)) {
        let spec = tokens.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>().join(" ");
        let ranges = parse_slot_spec(&spec).unwrap();

        let rendered = format_slot_ranges(&ranges).replace(['[', ']'], "");

        prop_assert_eq!(parse_slot_spec(&rendered).unwrap(), ranges);
    }

    /// Property: slots at or past the slot space are rejected.
    #[test]
    fn test_out_of_range_slot_rejected(slot in TOTAL_SLOTS..u16::MAX) {
        let single = slot.to_string();
        let range = format!("0-{}", slot);
        prop_assert!(parse_slot_spec(&single).is_err());
        prop_assert!(parse_slot_spec(&range).is_err());
    }

    /// Property: coverage of a contiguous partition is always complete.
    #[test]
    fn test_partition_coverage_is_complete(cuts in prop::collection::btree_set(1..TOTAL_SLOTS, 0..10)) {
        let mut bounds = vec![0u16];
        bounds.extend(cuts.iter().copied());
        bounds.push(TOTAL_SLOTS);
        let ranges: Vec<SlotRange> = bounds
            .windows(2)
            .map(|w| SlotRange::new(w[0], w[1] - 1).unwrap())
            .collect();

        let coverage = SlotCoverage::from_ranges(&ranges);

        prop_assert!(coverage.is_complete());
        prop_assert_eq!(coverage.missing(), 0);
        prop_assert_eq!(coverage.duplicated(), 0);
    }

    /// Property: every key:value line is recovered; headers and blanks are ignored.
    #[test]
    fn test_info_block_round_trip(
        fields in prop::collection::btree_map(field_name(), field_value(), 0..15)
    ) {
        let mut block = String::from("# Server\r\n\r\n");
        for (key, value) in &fields {
            block.push_str(&format!("{}:{}\r\n", key, value));
        }
        block.push_str("# Keyspace\r\n");

        let parsed = parse_info_block(&block);

        prop_assert_eq!(parsed.len(), fields.len());
        for (key, value) in &fields {
            prop_assert_eq!(parsed.get(key).map(String::as_str), Some(value.trim()));
        }
    }

    /// Property: one member row per non-empty line, address without bus port.
    #[test]
    fn test_member_table_rows(
        ports in prop::collection::vec(1024u16..60000, 1..8),
        spec in prop::collection::vec(slot_token(), 0..4)
    ) {
        let spec = spec.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>().join(" ");
        let mut text = String::new();
        for (idx, port) in ports.iter().enumerate() {
            text.push_str(&format!(
                "{:040x} 10.0.0.1:{}@{} master - 0 0 {} connected {}\n",
                idx, port, u32::from(*port) + 10000, idx, spec
            ));
        }

        let table = parse_member_table(&text).unwrap();

        prop_assert_eq!(table.len(), ports.len());
        for (row, port) in table.rows.iter().zip(&ports) {
            prop_assert_eq!(&row.address, &format!("10.0.0.1:{}", port));
            prop_assert_eq!(row.slot_spec.trim_end(), spec.as_str());
        }
    }

    /// Property: address lists are classified as addresses.
    #[test]
    fn test_address_lists_are_addresses(
        hosts in prop::collection::vec((0u8..=255, 1u16..=65535), 1..5)
    ) {
        let list = hosts
            .iter()
            .map(|(octet, port)| format!("10.0.0.{}:{}", octet, port))
            .collect::<Vec<_>>()
            .join(",");

        prop_assert!(matches!(Target::from_list(&list).unwrap(), Target::Addresses(_)));
    }
}
