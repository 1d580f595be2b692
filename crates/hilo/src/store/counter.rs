use crate::schema::TableSpec;
use crate::store::CounterTx;

/// Transactional accessor over the counter table.
///
/// Reads the current high-water mark and atomically advances it. The caller
/// controls the transaction boundary, so the read and the increment commit
/// (or roll back) together.
///
/// # Example
/// ```
/// use hilo::{CounterBackend, CounterStore, MemoryBackend, TableSpec};
///
/// let backend = MemoryBackend::new();
/// let store = CounterStore::single(TableSpec::single("single_hilo", None));
///
/// // First-ever allocation creates the row and returns 0.
/// let hi = backend.with_transaction(|tx| store.fetch_and_advance(tx))?;
/// assert_eq!(hi, 0);
/// let hi = backend.with_transaction(|tx| store.fetch_and_advance(tx))?;
/// assert_eq!(hi, 1);
/// # Ok::<(), hilo::MemoryUnavailable>(())
/// ```
#[derive(Debug, Clone)]
pub struct CounterStore {
    table: TableSpec,
    key: Option<String>,
}

impl CounterStore {
    /// A store over the sole row of an unkeyed counter table.
    pub fn single(table: TableSpec) -> Self {
        Self { table, key: None }
    }

    /// A store scoped to one row of a keyed counter table.
    pub fn keyed(table: TableSpec, key: impl Into<String>) -> Self {
        Self {
            table,
            key: Some(key.into()),
        }
    }

    /// The declared counter table this store reads and writes.
    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    /// The secondary key scoping this store, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Fetches the next `hi` value, advancing the stored high-water mark.
    ///
    /// The first-ever allocation for a scope finds no row: a fresh row with
    /// `next_hi = 0` is inserted and `0` returned. Every later call writes
    /// back `next_hi + 1` and returns it, so `next_hi` is monotonically
    /// non-decreasing for the lifetime of the table. One insert or update
    /// per call, never a delete.
    ///
    /// # Errors
    ///
    /// Propagates the transaction's storage error unchanged; nothing is
    /// retried here.
    pub fn fetch_and_advance<T: CounterTx>(&self, tx: &mut T) -> Result<i64, T::Error> {
        let key = self.key.as_deref();
        match tx.select_hi(&self.table, key)? {
            None => {
                tx.insert_hi(&self.table, key, 0)?;
                Ok(0)
            }
            Some(next_hi) => {
                let next_hi = next_hi + 1;
                tx.update_hi(&self.table, key, next_hi)?;
                Ok(next_hi)
            }
        }
    }
}
