use core::fmt;

/// A minimal interface for issuing fresh primary-key identifiers.
///
/// The host's insert path calls [`IdAllocator::next_id`] once per row that
/// needs a key; everything else (blocks, refills, counter rows) stays behind
/// this seam.
pub trait IdAllocator {
    /// The error type returned by [`IdAllocator::next_id`].
    type Err: fmt::Debug;

    /// Returns the next identifier.
    ///
    /// # Errors
    ///
    /// Fails when a block refill cannot reach the counter store. No local
    /// state changes on failure, so calling again retries the refill and
    /// never skips or repeats an id.
    fn next_id(&self) -> Result<i64, Self::Err>;
}
