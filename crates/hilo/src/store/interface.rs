use core::error::Error as StdError;

use crate::schema::TableSpec;

/// Statement execution inside one open counter-table transaction.
///
/// These three operations are the whole surface the allocator drives: one
/// read and one conditional write per block refill. Implementations map them
/// onto whatever statement primitive the host database exposes.
///
/// The select-then-write pair always runs inside a transaction opened via
/// [`CounterBackend::with_transaction`]. Serializing concurrent refills of
/// the same row is the implementation's job (row-level locking, `SELECT ...
/// FOR UPDATE`, or equivalent), never application-level coordination.
pub trait CounterTx {
    /// The storage error produced by statement execution.
    type Error: StdError;

    /// Reads `next_hi` for the row matching `key`, or the sole row when
    /// `key` is `None`. Returns `None` when the row does not exist yet.
    fn select_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
    ) -> Result<Option<i64>, Self::Error>;

    /// Inserts the first row for this scope with the given `next_hi`.
    fn insert_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
        next_hi: i64,
    ) -> Result<(), Self::Error>;

    /// Writes back an advanced `next_hi` for an existing row.
    fn update_hi(
        &mut self,
        table: &TableSpec,
        key: Option<&str>,
        next_hi: i64,
    ) -> Result<(), Self::Error>;
}

/// A handle to the database holding the counter table.
///
/// Cloning a backend must yield a handle to the *same* underlying store
/// (think connection pool handle), so every allocator resolved from one
/// registry draws from one set of counter rows.
pub trait CounterBackend: Clone {
    /// The storage error produced by this backend.
    type Error: StdError;

    /// The transaction type handed to [`Self::with_transaction`] bodies.
    type Tx<'c>: CounterTx<Error = Self::Error>
    where
        Self: 'c;

    /// Opens a transaction, runs `body`, and commits.
    ///
    /// If `body` fails the transaction rolls back and the error propagates
    /// unchanged. The transaction lives entirely within this call; it is
    /// never held open across allocator calls.
    fn with_transaction<R>(
        &self,
        body: impl FnOnce(&mut Self::Tx<'_>) -> Result<R, Self::Error>,
    ) -> Result<R, Self::Error>;
}
