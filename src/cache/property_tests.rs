//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the mirror invariant under arbitrary operation
//! sequences against the in-memory store.

use proptest::prelude::*;
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::error::CacheError;
use crate::models::order::fixtures::order;
use crate::store::MemoryStore;

// == Strategies ==
/// Small id space so sequences revisit the same orders
fn id_strategy() -> impl Strategy<Value = String> {
    "[a-e][0-9]".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Write { id: String },
    Read { id: String },
    /// Row appears in the store without passing through the cache
    Seed { id: String },
    Resync,
    /// One-off query fault on the next store call
    Glitch,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => id_strategy().prop_map(|id| CacheOp::Write { id }),
        4 => id_strategy().prop_map(|id| CacheOp::Read { id }),
        2 => id_strategy().prop_map(|id| CacheOp::Seed { id }),
        1 => Just(CacheOp::Resync),
        1 => Just(CacheOp::Glitch),
    ]
}

fn setup() -> (Arc<MemoryStore>, CacheManager) {
    let store = Arc::new(MemoryStore::new());
    let cache = CacheManager::new(store.clone(), true);
    tokio_test::block_on(cache.initialize()).unwrap();
    (store, cache)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Mirror invariant: after any operation sequence, every cached order
    // equals the store's row for the same id.
    #[test]
    fn prop_mirror_invariant(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (store, cache) = setup();

        for op in ops {
            match op {
                CacheOp::Write { id } => {
                    let _ = tokio_test::block_on(cache.write_order(order(&id)));
                }
                CacheOp::Read { id } => {
                    let _ = tokio_test::block_on(cache.read(&id));
                }
                CacheOp::Seed { id } => {
                    if store.row(&id).is_none() {
                        store.seed(order(&id));
                    }
                }
                CacheOp::Resync => {
                    let _ = tokio_test::block_on(cache.resync());
                }
                CacheOp::Glitch => store.fail_next_query(),
            }

            for (id, cached) in tokio_test::block_on(cache.snapshot()) {
                prop_assert_eq!(store.row(&id), Some(cached), "cache disagrees with store");
            }
        }
    }

    // Writing an unseen id grows the mirror by exactly one and the following
    // read is served from memory.
    #[test]
    fn prop_write_then_read(ids in prop::collection::hash_set(id_strategy(), 1..20)) {
        let (store, cache) = setup();

        for id in ids {
            let before = tokio_test::block_on(cache.len());
            tokio_test::block_on(cache.write_order(order(&id))).unwrap();
            prop_assert_eq!(tokio_test::block_on(cache.len()), before + 1);

            let loads = store.calls().load_one;
            let read = tokio_test::block_on(cache.read(&id)).unwrap();
            prop_assert_eq!(read, order(&id));
            prop_assert_eq!(store.calls().load_one, loads, "hit path touched the store");
        }
    }

    // A second write of the same id is rejected and the mirror keeps the first value.
    #[test]
    fn prop_duplicate_rejection(id in id_strategy(), track in "[A-Z]{4,12}") {
        let (_store, cache) = setup();
        tokio_test::block_on(cache.write_order(order(&id))).unwrap();

        let mut second = order(&id);
        second.track_number = track;
        let result = tokio_test::block_on(cache.write_order(second));

        prop_assert!(matches!(result, Err(CacheError::DuplicateKey(_))));
        prop_assert_eq!(tokio_test::block_on(cache.cached(&id)), Some(order(&id)));
        prop_assert_eq!(tokio_test::block_on(cache.len()), 1);
    }

    // Two resyncs with no writes in between produce the same mirror.
    #[test]
    fn prop_resync_idempotent(ids in prop::collection::hash_set(id_strategy(), 0..30)) {
        let (store, cache) = setup();
        for id in &ids {
            store.seed(order(id));
        }

        tokio_test::block_on(cache.resync()).unwrap();
        let first = tokio_test::block_on(cache.snapshot());
        tokio_test::block_on(cache.resync()).unwrap();
        let second = tokio_test::block_on(cache.snapshot());

        prop_assert_eq!(first.len(), ids.len());
        prop_assert_eq!(first, second);
    }
}
