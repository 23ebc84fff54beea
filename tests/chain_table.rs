// ChainTable integration tests: the public API exercised end to end,
// including the keyed-record scenarios from the design discussion
// (elements hashed and compared on a key field, carrying a payload).

use chain_table::{BlobPolicy, ChainTable, FnPolicy, InsertError, TableConfig, Traversal, Visit};
use core::cmp::Ordering;
use std::collections::BTreeSet;

/// A keyed record: identity is the key alone, the payload rides along.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Record {
    key: u64,
    payload: &'static str,
}

fn record(key: u64, payload: &'static str) -> Record {
    Record { key, payload }
}

fn probe(key: u64) -> Record {
    Record { key, payload: "" }
}

fn record_policy() -> FnPolicy<Record> {
    fn h(e: &Record, _: &()) -> u32 {
        e.key as u32
    }
    fn c(a: &Record, b: &Record, _: &()) -> Ordering {
        a.key.cmp(&b.key)
    }
    FnPolicy::new(h, c, ())
}

fn record_table() -> ChainTable<Record, FnPolicy<Record>> {
    ChainTable::with_config(
        record_policy(),
        TableConfig {
            size_log: 4,
            ..TableConfig::default()
        },
    )
}

/// Keys 1, 17, 33 chain together at bucket 1 while key 2 roots its own
/// chain; each lookup returns the record with the matching payload,
/// fill is exact, and a traversal yields the full set with no
/// duplicates.
#[test]
fn congruent_keys_keep_their_payloads() {
    let mut t = record_table();
    t.add(record(1, "one")).unwrap();
    t.add(record(2, "two")).unwrap();
    t.add(record(17, "seventeen")).unwrap();
    t.add(record(33, "thirty-three")).unwrap();
    assert_eq!(t.len(), 4);

    assert_eq!(t.get(&probe(17)).map(|r| r.payload), Some("seventeen"));
    assert_eq!(t.get(&probe(33)).map(|r| r.payload), Some("thirty-three"));

    let mut seen = Vec::new();
    let end = t.for_each(|r| {
        seen.push(r.key);
        Visit::Continue
    });
    assert_eq!(end, Traversal::Completed);
    let unique: BTreeSet<u64> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "no element may be visited twice");
    assert_eq!(unique, [1, 2, 17, 33].into_iter().collect());
    t.check_invariants();
}

/// Inserting a record whose key is already present is a duplicate even
/// when the payload differs; the stored record is untouched.
#[test]
fn duplicate_key_keeps_original_payload() {
    let mut t = record_table();
    t.add(record(9, "original")).unwrap();
    match t.add(record(9, "usurper")) {
        Err(InsertError::Duplicate(rejected)) => assert_eq!(rejected.payload, "usurper"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(t.len(), 1);
    assert_eq!(t.get(&probe(9)).map(|r| r.payload), Some("original"));
}

/// 100 distinct keys under default watermarks: at least one grow
/// happened and fill is exact.
#[test]
fn hundred_inserts_grow_the_table() {
    let mut t = record_table();
    let initial_capacity = t.capacity();
    for k in 0..100 {
        t.add(record(k, "x")).unwrap();
    }
    assert!(t.capacity() > initial_capacity);
    assert_eq!(t.len(), 100);
    for k in 0..100 {
        assert!(t.get(&probe(k)).is_some(), "key {} lost", k);
    }
    t.check_invariants();
}

/// Removing all but one of 100 records shrinks the table and the
/// survivor is still found.
#[test]
fn mass_removal_shrinks_the_table() {
    let mut t = record_table();
    for k in 0..100 {
        t.add(record(k, "x")).unwrap();
    }
    let grown_capacity = t.capacity();
    for k in 0..99 {
        assert!(t.remove(&probe(k)));
    }
    assert!(t.capacity() < grown_capacity, "expected at least one shrink");
    assert_eq!(t.len(), 1);
    assert_eq!(t.get(&probe(99)).map(|r| r.payload), Some("x"));
    t.check_invariants();
}

/// A full ordered dump before and after a forced resize yields the same
/// sequence: resizing neither loses nor duplicates elements.
#[test]
fn resize_is_transparent_to_ordered_dump() {
    let mut t = record_table();
    for k in [12u64, 7, 99, 4, 55, 23, 8, 71] {
        t.add(record(k, "x")).unwrap();
    }
    let dump = |t: &mut ChainTable<Record, FnPolicy<Record>>| {
        let mut keys = Vec::new();
        t.for_each_ordered(|r| {
            keys.push(r.key);
            Visit::Continue
        });
        keys
    };
    let before = dump(&mut t);
    t.resize(10);
    let after_grow = dump(&mut t);
    t.resize(4);
    let after_shrink = dump(&mut t);
    assert_eq!(before, after_grow);
    assert_eq!(before, after_shrink);
    t.check_invariants();
}

/// The ordered traversal visits records in key order regardless of
/// insertion order, and a deletion during the replay reaches the live
/// table.
#[test]
fn ordered_traversal_orders_and_deletes() {
    let mut t = record_table();
    for k in [30u64, 10, 40, 20] {
        t.add(record(k, "x")).unwrap();
    }
    let mut order = Vec::new();
    t.for_each_ordered(|r| {
        order.push(r.key);
        if r.key == 20 {
            Visit::Delete
        } else {
            Visit::Continue
        }
    });
    assert_eq!(order, vec![10, 20, 30, 40]);
    assert_eq!(t.len(), 3);
    assert!(t.get(&probe(20)).is_none());
    t.check_invariants();
}

/// Opaque fixed-size byte elements round-trip through `BlobPolicy`:
/// hashing and ordering on the leading 4 bytes, payload in the rest.
#[test]
fn blob_policy_round_trip() {
    fn h(e: &[u8], _: &()) -> u32 {
        u32::from_le_bytes([e[0], e[1], e[2], e[3]])
    }
    fn c(a: &[u8], b: &[u8], _: &()) -> Ordering {
        a[..4].cmp(&b[..4])
    }
    let policy = BlobPolicy::new(8, h, c, ());
    assert_eq!(policy.elem_size(), 8);
    let mut t: ChainTable<Box<[u8]>, _> = ChainTable::with_policy(policy);

    let blob = |key: u32, tag: u32| -> Box<[u8]> {
        let mut b = Vec::with_capacity(8);
        b.extend_from_slice(&key.to_le_bytes());
        b.extend_from_slice(&tag.to_le_bytes());
        b.into_boxed_slice()
    };

    for key in 0..20u32 {
        t.add(blob(key, key * 100)).unwrap();
    }
    assert_eq!(t.len(), 20);
    // Lookup goes by the 4-byte key; the stored tag comes back.
    let found = t.get(&blob(7, 0)).expect("key 7 present");
    assert_eq!(&found[4..], &700u32.to_le_bytes());
    // Same key, different tag: still a duplicate.
    assert!(t.add(blob(7, 9999)).is_err());
    assert!(t.remove(&blob(7, 0)));
    assert_eq!(t.get(&blob(7, 0)), None);
    t.check_invariants();
}

/// Traversal completeness survives a resize history: grow, shrink, then
/// verify every element is visited exactly once.
#[test]
fn traversal_complete_after_resize_history() {
    let mut t = record_table();
    for k in 0..200 {
        t.add(record(k, "x")).unwrap();
    }
    for k in 100..200 {
        assert!(t.remove(&probe(k)));
    }
    let mut seen = BTreeSet::new();
    let mut visits = 0usize;
    t.for_each(|r| {
        seen.insert(r.key);
        visits += 1;
        Visit::Continue
    });
    assert_eq!(visits, 100);
    assert_eq!(seen, (0..100).collect());
    t.check_invariants();
}
