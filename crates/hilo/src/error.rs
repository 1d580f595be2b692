/// A result type for allocator operations, generic over the backend's
/// storage error.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Two allocator identities collided with incompatible configuration.
///
/// The registry caches one allocator per identity for the lifetime of the
/// process. Re-resolving a cached identity with a different block size would
/// silently change the numbering scheme of ids already handed out, so it
/// fails fast instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "allocator `{identity}` is already registered with block size {existing}, not {requested}"
)]
pub struct ConfigConflict {
    /// Serialized identity of the cached allocator.
    pub identity: String,
    /// Block size the cached allocator was registered with.
    pub existing: i64,
    /// Block size the conflicting resolution asked for.
    pub requested: i64,
}

/// All error variants that `hilo` can emit.
///
/// The generic parameter `E` is the storage error of the
/// [`CounterBackend`](crate::CounterBackend) in use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// The refill transaction could not complete (connectivity loss,
    /// deadlock, constraint violation).
    ///
    /// The `lo` that triggered the refill was not consumed, so allocator
    /// state is unchanged and calling
    /// [`next_id`](crate::HiLoAllocator::next_id) again retries the refill.
    #[error("counter store unavailable: {0}")]
    Storage(#[source] E),

    /// An allocator identity resolved against conflicting cached
    /// configuration.
    #[error(transparent)]
    Conflict(#[from] ConfigConflict),

    /// `hi * block + lo` no longer fits in the signed 64-bit identifier
    /// space.
    #[error("identifier space exhausted at hi block {hi} (block size {block})")]
    Exhausted {
        /// The hi block that overflowed.
        hi: i64,
        /// Ids issued per block.
        block: i64,
    },
}
