use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::schema::TableSpec;
use crate::store::{CounterBackend, CounterTx};

/// Error produced by [`MemoryBackend`] fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("counter store unavailable (injected fault)")]
pub struct MemoryUnavailable;

type Rows = HashMap<(String, Option<String>), i64>;

#[derive(Debug, Default)]
struct Shared {
    rows: Mutex<Rows>,
    transactions: AtomicUsize,
    fail_next: AtomicBool,
}

/// In-memory counter backend.
///
/// A transaction holds the row-map lock for its whole body, which gives the
/// serialized read-modify-write the [`CounterBackend`] contract requires.
/// Clones share the same rows, so one `MemoryBackend` cloned into several
/// allocators behaves like one database reached from several processes.
///
/// Meant for tests, benches, and doc examples; a production deployment wires
/// [`CounterBackend`] and [`CounterTx`] to a real driver instead.
///
/// # Example
/// ```
/// use hilo::{CounterBackend, CounterTx, MemoryBackend, TableSpec};
///
/// let backend = MemoryBackend::new();
/// let table = TableSpec::single("single_hilo", None);
/// backend.with_transaction(|tx| tx.insert_hi(&table, None, 7))?;
/// assert_eq!(backend.next_hi(&table, None), Some(7));
/// assert_eq!(backend.transactions(), 1);
/// # Ok::<(), hilo::MemoryUnavailable>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Creates an empty backend with no counter rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions begun so far.
    pub fn transactions(&self) -> usize {
        self.shared.transactions.load(Ordering::Relaxed)
    }

    /// Makes the next transaction fail before it begins.
    ///
    /// Exercises the storage-unavailable path: the failed transaction never
    /// starts, nothing is written, and the flag clears itself.
    pub fn fail_next_transaction(&self) {
        self.shared.fail_next.store(true, Ordering::Relaxed);
    }

    /// Current stored high-water mark for a scope, if the row exists.
    pub fn next_hi(&self, table: &TableSpec, key: Option<&str>) -> Option<i64> {
        self.shared.rows.lock().get(&row_key(table, key)).copied()
    }
}

/// An open [`MemoryBackend`] transaction.
///
/// Holds the backend's row lock until it is committed or rolled back by
/// [`CounterBackend::with_transaction`].
pub struct MemoryTx<'c> {
    rows: MutexGuard<'c, Rows>,
}

impl CounterTx for MemoryTx<'_> {
    type Error = MemoryUnavailable;

    fn select_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
    ) -> Result<Option<i64>, Self::Error> {
        Ok(self.rows.get(&row_key(table, key)).copied())
    }

    fn insert_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
        next_hi: i64,
    ) -> Result<(), Self::Error> {
        self.rows.insert(row_key(table, key), next_hi);
        Ok(())
    }

    fn update_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
        next_hi: i64,
    ) -> Result<(), Self::Error> {
        self.rows.insert(row_key(table, key), next_hi);
        Ok(())
    }
}

impl CounterBackend for MemoryBackend {
    type Error = MemoryUnavailable;
    type Tx<'c>
        = MemoryTx<'c>
    where
        Self: 'c;

    fn with_transaction<R>(
        &self,
        body: impl FnOnce(&mut Self::Tx<'_>) -> Result<R, Self::Error>,
    ) -> Result<R, Self::Error> {
        if self.shared.fail_next.swap(false, Ordering::Relaxed) {
            return Err(MemoryUnavailable);
        }
        self.shared.transactions.fetch_add(1, Ordering::Relaxed);

        let rows = self.shared.rows.lock();
        let snapshot = rows.clone();
        let mut tx = MemoryTx { rows };
        match body(&mut tx) {
            Ok(value) => Ok(value),
            Err(err) => {
                // Rollback: restore the rows as of transaction start.
                *tx.rows = snapshot;
                Err(err)
            }
        }
    }
}

fn row_key(table: &TableSpec, key: Option<&str>) -> (String, Option<String>) {
    (table.qualified_name(), key.map(str::to_owned))
}
