use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::{
    AllocatorConfig, AllocatorRegistry, CounterBackend, CounterTx, DEFAULT_BLOCK, Error,
    HiLoAllocator, IdAllocator, MemoryBackend, MemoryUnavailable, SINGLE_HILO_TABLE, TableSpec,
};

fn take<A: IdAllocator>(allocator: &A, n: usize) -> Vec<i64> {
    (0..n)
        .map(|_| allocator.next_id().expect("allocation failed"))
        .collect()
}

#[test]
fn first_allocation_on_empty_table_starts_at_one() {
    let backend = MemoryBackend::new();
    let allocator = HiLoAllocator::new(backend.clone(), &AllocatorConfig::new());

    assert_eq!(allocator.next_id().unwrap(), 1);
    // The discovered hi was 0 and is now durably stored.
    assert_eq!(backend.next_hi(allocator.table(), None), Some(0));
}

#[test]
fn ids_are_dense_across_block_boundaries() {
    let backend = MemoryBackend::new();
    let allocator =
        HiLoAllocator::new(backend, &AllocatorConfig::new().with_block(3));

    let ids = take(&allocator, 8);
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn default_block_size_is_ten_thousand() {
    let backend = MemoryBackend::new();
    let allocator = HiLoAllocator::new(backend, &AllocatorConfig::new());
    assert_eq!(allocator.block(), DEFAULT_BLOCK);
}

#[test]
fn one_refill_transaction_per_block() {
    let backend = MemoryBackend::new();
    let block = 5;
    let allocator = HiLoAllocator::new(
        backend.clone(),
        &AllocatorConfig::new().with_block(block),
    );

    take(&allocator, block as usize);
    assert_eq!(backend.transactions(), 1);

    allocator.next_id().unwrap();
    assert_eq!(backend.transactions(), 2);
}

#[test]
fn failed_refill_leaves_state_unchanged_and_is_retryable() {
    let backend = MemoryBackend::new();
    let allocator = HiLoAllocator::new(
        backend.clone(),
        &AllocatorConfig::new().with_block(2),
    );

    assert_eq!(take(&allocator, 2), vec![1, 2]);

    backend.fail_next_transaction();
    assert_eq!(
        allocator.next_id(),
        Err(Error::Storage(MemoryUnavailable))
    );
    // The lo that triggered the refill was not consumed: the retry issues
    // exactly the id the failed call would have.
    assert_eq!(allocator.next_id().unwrap(), 3);
    assert_eq!(take(&allocator, 3), vec![4, 5, 6]);
}

#[test]
fn registry_resolves_equal_configs_to_one_instance() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    let config = AllocatorConfig::new().with_block(4);

    let a = registry.allocator(&config).unwrap();
    let b = registry.allocator(&config).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // The "two" references drive one cursor: no duplicate ids.
    assert_eq!(a.next_id().unwrap(), 1);
    assert_eq!(b.next_id().unwrap(), 2);
    assert_eq!(a.next_id().unwrap(), 3);
}

#[test]
fn registry_rejects_block_size_conflicts() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    registry
        .allocator(&AllocatorConfig::new().with_block(10))
        .unwrap();

    let err = registry
        .allocator(&AllocatorConfig::new().with_block(20))
        .unwrap_err();
    assert_eq!(err.identity, "HiLoAllocator.single_hilo");
    assert_eq!(err.existing, 10);
    assert_eq!(err.requested, 20);
}

#[test]
fn distinct_names_get_distinct_allocators() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    let a = registry
        .allocator(&AllocatorConfig::new().with_name("a_hilo"))
        .unwrap();
    let b = registry
        .allocator(&AllocatorConfig::new().with_name("b_hilo"))
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    // Independent counter rows, independent sequences.
    assert_eq!(a.next_id().unwrap(), 1);
    assert_eq!(b.next_id().unwrap(), 1);
}

#[test]
fn keyed_sequences_are_independent_and_dense() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    let keyed = registry.template(&AllocatorConfig::new().with_block(2));

    assert_eq!(keyed.next_id("orders").unwrap(), 1);
    assert_eq!(keyed.next_id("users").unwrap(), 1);
    assert_eq!(keyed.next_id("orders").unwrap(), 2);

    // Exhausting the orders block refills orders only; users is untouched.
    assert_eq!(keyed.next_id("orders").unwrap(), 3);
    assert_eq!(keyed.next_id("users").unwrap(), 2);
    assert_eq!(keyed.next_id("users").unwrap(), 3);
    assert_eq!(keyed.next_id("orders").unwrap(), 4);
}

#[test]
fn equal_templates_bind_to_the_same_child() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    let config = AllocatorConfig::new();

    let first = registry.template(&config);
    let second = registry.template(&config);
    let a = first.bind("orders").unwrap();
    let b = second.bind("orders").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn template_block_conflict_fails_fast() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    registry
        .template(&AllocatorConfig::new().with_block(10))
        .bind("orders")
        .unwrap();

    let err = registry
        .template(&AllocatorConfig::new().with_block(20))
        .bind("orders")
        .unwrap_err();
    assert_eq!(err.existing, 10);
    assert_eq!(err.requested, 20);
}

#[test]
fn bound_child_shares_table_but_not_cursor() {
    let registry = AllocatorRegistry::new(MemoryBackend::new());
    let keyed = registry.template(&AllocatorConfig::new().with_schema("app"));

    let orders = keyed.bind("orders").unwrap();
    let users = keyed.bind("users").unwrap();
    assert_eq!(orders.table(), users.table());
    assert_eq!(orders.table().qualified_name(), "app.row_per_table_hilo");
    assert_eq!(orders.key(), Some("orders"));
    assert_eq!(users.key(), Some("users"));
}

#[test]
fn independent_instances_never_hand_out_overlapping_blocks() {
    // Two allocator instances over one database, standing in for two
    // processes drawing from the same counter row.
    let backend = MemoryBackend::new();
    let config = AllocatorConfig::new().with_block(1000);
    let a = HiLoAllocator::new(backend.clone(), &config);
    let b = HiLoAllocator::new(backend, &config);

    assert_eq!(a.next_id().unwrap(), 1);
    // B's refill must start past A's whole block, not reuse any of it.
    assert_eq!(b.next_id().unwrap(), 1001);

    // A drains its block, then refills past B's.
    let rest = take(&a, 999);
    assert_eq!(*rest.last().unwrap(), 1000);
    assert_eq!(a.next_id().unwrap(), 2001);
}

#[test]
fn restart_issues_strictly_greater_ids() {
    let backend = MemoryBackend::new();
    let config = AllocatorConfig::new().with_block(10);

    let allocator = HiLoAllocator::new(backend.clone(), &config);
    let issued = take(&allocator, 3);
    drop(allocator);

    // A fresh instance simulates a process restart: in-memory state is
    // gone, the counter survives. The unissued remainder of the old block
    // is discarded, never reissued.
    let revived = HiLoAllocator::new(backend, &config);
    let id = revived.next_id().unwrap();
    assert_eq!(id, 11);
    assert!(issued.iter().all(|&old| id > old));
}

#[test]
fn concurrent_callers_never_skip_or_repeat() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 500;

    let backend = MemoryBackend::new();
    let allocator = Arc::new(HiLoAllocator::new(
        backend.clone(),
        &AllocatorConfig::new().with_block(64),
    ));

    let mut ids = HashSet::new();
    thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                s.spawn(move || take(allocator.as_ref(), PER_THREAD))
            })
            .collect();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }
    });

    assert_eq!(ids.len(), THREADS * PER_THREAD);
    // One instance holds one live block at a time, so the blocks fetched
    // and the issued range are exact regardless of interleaving.
    let blocks = (THREADS * PER_THREAD).div_ceil(64);
    assert_eq!(backend.transactions(), blocks);
    assert!(ids.iter().all(|&id| id >= 1 && id <= (blocks as i64) * 64));
}

#[test]
fn identifier_space_exhaustion_is_detected() {
    let backend = MemoryBackend::new();
    let table = TableSpec::single(SINGLE_HILO_TABLE, None);
    // Seed the counter so the next fetched hi block straddles i64::MAX.
    let seed = i64::MAX / DEFAULT_BLOCK - 1;
    backend
        .with_transaction(|tx| tx.insert_hi(&table, None, seed))
        .unwrap();

    let allocator = HiLoAllocator::new(backend, &AllocatorConfig::new());
    let base = (seed + 1) * DEFAULT_BLOCK;
    let room = i64::MAX - base;
    for lo in 1..=room {
        assert_eq!(allocator.next_id().unwrap(), base + lo);
    }

    // The very last representable id was issued; the block still has lo
    // room, so the failure is exhaustion, not a refill.
    let err = allocator.next_id().unwrap_err();
    assert_eq!(
        err,
        Error::Exhausted {
            hi: seed + 1,
            block: DEFAULT_BLOCK
        }
    );
    assert_eq!(allocator.next_id().unwrap_err(), err);
}
