// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the open-addressed hash table.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use proptest::prelude::*;
use std::collections::HashMap;

use super::*;

/// A numeric key and the hash the heap would compute for it.
fn key(n: u32) -> (Value, u32) {
    (Value::number(f64::from(n)), n)
}

#[test]
fn get_on_empty_table_misses() {
    let table = Table::new();
    let (k, h) = key(1);
    assert_eq!(table.get(k, h), None);
    assert!(table.is_empty());
}

#[test]
fn set_then_get() {
    let mut table = Table::new();
    let (k, h) = key(1);

    assert!(table.set(k, h, Value::number(10.0)));
    assert_eq!(table.get(k, h), Some(Value::number(10.0)));
    assert_eq!(table.len(), 1);
}

#[test]
fn set_existing_key_replaces() {
    let mut table = Table::new();
    let (k, h) = key(1);

    assert!(table.set(k, h, Value::number(10.0)));
    assert!(!table.set(k, h, Value::number(20.0)));
    assert_eq!(table.get(k, h), Some(Value::number(20.0)));
    assert_eq!(table.len(), 1);
}

#[test]
fn delete_leaves_probe_chains_intact() {
    let mut table = Table::new();

    // Three keys with the same hash collide into one probe chain.
    let a = Value::number(1.0);
    let b = Value::number(2.0);
    let c = Value::number(3.0);
    let hash = 7;
    table.set(a, hash, Value::number(10.0));
    table.set(b, hash, Value::number(20.0));
    table.set(c, hash, Value::number(30.0));

    // Deleting the middle entry must not hide the one probed after it.
    assert!(table.delete(b, hash));
    assert_eq!(table.get(b, hash), None);
    assert_eq!(table.get(a, hash), Some(Value::number(10.0)));
    assert_eq!(table.get(c, hash), Some(Value::number(30.0)));
    assert_eq!(table.len(), 2);
}

#[test]
fn delete_missing_key_is_false() {
    let mut table = Table::new();
    let (k, h) = key(1);
    assert!(!table.delete(k, h));

    table.set(k, h, Value::TRUE);
    let (other, other_hash) = key(2);
    assert!(!table.delete(other, other_hash));
}

#[test]
fn tombstone_slot_is_reused() {
    let mut table = Table::new();
    let (k, h) = key(1);

    table.set(k, h, Value::number(1.0));
    table.delete(k, h);
    assert!(table.set(k, h, Value::number(2.0)));
    assert_eq!(table.get(k, h), Some(Value::number(2.0)));
}

#[test]
fn grows_past_load_factor() {
    let mut table = Table::new();

    for n in 0..100 {
        let (k, h) = key(n);
        table.set(k, h, Value::number(f64::from(n * 2)));
    }

    assert_eq!(table.len(), 100);
    for n in 0..100 {
        let (k, h) = key(n);
        assert_eq!(table.get(k, h), Some(Value::number(f64::from(n * 2))));
    }
}

#[test]
fn resize_drops_tombstones() {
    let mut table = Table::new();

    // Fill with short-lived keys so tombstones accumulate.
    for n in 0..64 {
        let (k, h) = key(n);
        table.set(k, h, Value::TRUE);
        table.delete(k, h);
    }
    let (k, h) = key(1000);
    table.set(k, h, Value::TRUE);

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(k, h), Some(Value::TRUE));
}

#[test]
fn add_all_copies_live_entries_only() {
    let mut src = Table::new();
    let mut dst = Table::new();

    let (a, ah) = key(1);
    let (b, bh) = key(2);
    src.set(a, ah, Value::number(1.0));
    src.set(b, bh, Value::number(2.0));
    src.delete(b, bh);

    src.add_all(&mut dst);
    assert_eq!(dst.len(), 1);
    assert_eq!(dst.get(a, ah), Some(Value::number(1.0)));
    assert_eq!(dst.get(b, bh), None);
}

#[test]
fn find_key_matches_by_predicate() {
    let mut table = Table::new();
    let (k, h) = key(5);
    table.set(k, h, Value::NULL);

    let found = table.find_key(h, |candidate| values_equal(candidate, k));
    assert_eq!(found, Some(k));

    // Same hash, rejected by the predicate.
    let missed = table.find_key(h, |_| false);
    assert_eq!(missed, None);

    // Unknown hash.
    assert_eq!(table.find_key(12345, |_| true), None);
}

#[test]
fn iter_visits_every_live_entry() {
    let mut table = Table::new();
    for n in 0..10 {
        let (k, h) = key(n);
        table.set(k, h, Value::number(f64::from(n)));
    }
    let (dead, dead_hash) = key(3);
    table.delete(dead, dead_hash);

    let mut seen: Vec<u32> = table.iter().map(|(k, _)| k.as_number() as u32).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 4, 5, 6, 7, 8, 9]);
}

proptest! {
    /// The table agrees with a HashMap model under arbitrary interleaved
    /// inserts, deletes, and lookups.
    #[test]
    fn behaves_like_a_map(ops in prop::collection::vec((0u8..3, 0u32..64, 0u32..1000), 0..300)) {
        let mut table = Table::new();
        let mut model: HashMap<u32, u32> = HashMap::new();

        for (op, k, v) in ops {
            let (value_key, hash) = key(k);
            match op {
                0 => {
                    let was_new = table.set(value_key, hash, Value::number(f64::from(v)));
                    let model_new = model.insert(k, v).is_none();
                    prop_assert_eq!(was_new, model_new);
                }
                1 => {
                    let removed = table.delete(value_key, hash);
                    let model_removed = model.remove(&k).is_some();
                    prop_assert_eq!(removed, model_removed);
                }
                _ => {
                    let got = table.get(value_key, hash).map(|v| v.as_number() as u32);
                    prop_assert_eq!(got, model.get(&k).copied());
                }
            }
        }

        prop_assert_eq!(table.len(), model.len());
    }
}
