#![allow(dead_code)]

use sieve_store::{IndexType, MemoryStore, Record};

pub const COLL: &str = "bench";

/// Generate `n` records with a small numeric bin, a low-cardinality string
/// bin, and some padding.
pub fn generate_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new(format!("rec-{i}"))
                .with("name", format!("User {i}"))
                .with("status", if i % 2 == 0 { "active" } else { "rejected" })
                .with("score", (i % 100) as i64)
                .with("padding", "x".repeat(120))
        })
        .collect()
}

/// A store holding `n` generated records with `score` and `status` indexed.
pub fn seeded_store(n: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_collection(COLL).unwrap();
    for record in generate_records(n) {
        store.put(COLL, record).unwrap();
    }
    store
        .create_index(COLL, "score_idx", "score", IndexType::Numeric)
        .unwrap();
    store
        .create_index(COLL, "status_idx", "status", IndexType::String)
        .unwrap();
    store
}
