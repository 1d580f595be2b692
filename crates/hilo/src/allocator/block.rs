use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    allocator::IdAllocator,
    config::AllocatorConfig,
    error::{Error, Result},
    schema::{SINGLE_HILO_TABLE, TableSpec},
    store::{CounterBackend, CounterStore},
};

/// In-memory hi/lo cursor.
///
/// `hi` stays unset until the first refill. Once set, `0 < lo <= block`
/// holds and the last issued id equals `hi * block + lo`. The cursor is
/// owned exclusively by its allocator and never persisted: a process restart
/// discards the unissued remainder of the block, which is safe because
/// `next_hi` was already durably advanced past it.
#[derive(Debug)]
struct HiLoState {
    hi: Option<i64>,
    lo: i64,
}

/// A block-based primary-key allocator backed by a shared counter table.
///
/// Issues ids by combining a cached `hi` block with a locally incremented
/// `lo` offset, touching the counter table only once per `block` issuances.
/// Each fetched `hi` yields exactly `block` ids, numbered
/// `hi * block + 1 ..= hi * block + block`; `hi * block + 0` is never
/// issued.
///
/// ## Features
/// - ✅ Thread-safe: the whole check-refill-increment sequence runs under
///   one [`Mutex`], so concurrent callers never skip or repeat an id
/// - ✅ Retry-safe: a failed refill leaves the cursor untouched
///
/// ## Recommended When
/// - You batch-insert rows and an auto-increment round trip per row is too
///   expensive
/// - Ids must stay compact and roughly insertion-ordered (unlike UUIDs)
///
/// ## See Also
/// - [`KeyedHiLoAllocator`] for one independent sequence per table key
/// - [`AllocatorRegistry`] to share one instance per configuration
///
/// # Example
/// ```
/// use hilo::{AllocatorConfig, HiLoAllocator, MemoryBackend};
///
/// let backend = MemoryBackend::new();
/// let ids = HiLoAllocator::new(backend, &AllocatorConfig::new().with_block(100));
///
/// // An empty counter table yields hi = 0; lo is pre-incremented.
/// assert_eq!(ids.next_id()?, 1);
/// assert_eq!(ids.next_id()?, 2);
/// # Ok::<(), hilo::Error<hilo::MemoryUnavailable>>(())
/// ```
///
/// [`KeyedHiLoAllocator`]: crate::allocator::KeyedHiLoAllocator
/// [`AllocatorRegistry`]: crate::registry::AllocatorRegistry
#[derive(Debug)]
pub struct HiLoAllocator<B>
where
    B: CounterBackend,
{
    state: Mutex<HiLoState>,
    store: CounterStore,
    backend: B,
    block: i64,
}

impl<B> HiLoAllocator<B>
where
    B: CounterBackend,
{
    /// Creates an unkeyed allocator from `config`.
    ///
    /// Prefer resolving through
    /// [`AllocatorRegistry`](crate::registry::AllocatorRegistry) so equal
    /// configurations share one instance; constructing directly gives this
    /// allocator a private `(hi, lo)` cursor.
    pub fn new(backend: B, config: &AllocatorConfig) -> Self {
        let table = TableSpec::single(
            config.table_name(SINGLE_HILO_TABLE),
            config.schema().map(str::to_owned),
        );
        Self::with_store(backend, CounterStore::single(table), config.block())
    }

    pub(crate) fn with_store(backend: B, store: CounterStore, block: i64) -> Self {
        Self {
            state: Mutex::new(HiLoState { hi: None, lo: 0 }),
            store,
            backend,
            block,
        }
    }

    /// The declared counter table backing this allocator.
    ///
    /// Hand this to the host's table-creation machinery so the counter table
    /// is created alongside the application tables.
    pub fn table(&self) -> &TableSpec {
        self.store.table()
    }

    /// The secondary key scoping this allocator's counter row, if any.
    pub fn key(&self) -> Option<&str> {
        self.store.key()
    }

    /// Ids issued per fetched `hi` block.
    pub fn block(&self) -> i64 {
        self.block
    }

    /// Returns the next identifier.
    ///
    /// Issues from the cached block when one is live; otherwise opens a
    /// short transaction on the backend, advances the shared counter, and
    /// resumes issuing locally. The transaction is opened, used, and
    /// committed entirely within this call.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if the refill transaction fails. The cursor is
    ///   unchanged, so calling again retries the refill.
    /// - [`Error::Exhausted`] if `hi * block + lo` overflows the `i64`
    ///   identifier space.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<i64, B::Error> {
        let mut state = self.state.lock();
        let hi = match state.hi {
            Some(hi) if state.lo < self.block => hi,
            _ => self.refill(&mut state)?,
        };

        let lo = state.lo + 1;
        let id = hi
            .checked_mul(self.block)
            .and_then(|base| base.checked_add(lo))
            .ok_or(Error::Exhausted {
                hi,
                block: self.block,
            })?;
        state.lo = lo;
        Ok(id)
    }

    #[cold]
    #[inline(never)]
    fn refill(&self, state: &mut HiLoState) -> Result<i64, B::Error> {
        let hi = self
            .backend
            .with_transaction(|tx| self.store.fetch_and_advance(tx))
            .map_err(Error::Storage)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            hi,
            block = self.block,
            table = %self.store.table().qualified_name(),
            key = self.store.key().unwrap_or_default(),
            "grabbed hi block"
        );
        state.hi = Some(hi);
        state.lo = 0;
        Ok(hi)
    }
}

impl<B> IdAllocator for HiLoAllocator<B>
where
    B: CounterBackend,
{
    type Err = Error<B::Error>;

    fn next_id(&self) -> core::result::Result<i64, Self::Err> {
        self.next_id()
    }
}
