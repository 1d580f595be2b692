//! Process-wide allocator cache.
//!
//! The `(hi, lo)` cursor must exist exactly once per allocator identity
//! within a process: a duplicated cursor hands out duplicate ids, a lost one
//! burns a block. The registry memoizes construction so equal configurations
//! resolve to the same shared instance. Entries are never evicted;
//! identities are expected to be few and stable (one per entity or table).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    allocator::{HiLoAllocator, KeyedHiLoAllocator},
    config::AllocatorConfig,
    error::ConfigConflict,
    schema::{ROW_PER_TABLE_HILO_TABLE, SINGLE_HILO_TABLE, TableSpec},
    store::{CounterBackend, CounterStore},
};

/// Which counter-table layout an identity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// One counter row for the whole table ([`HiLoAllocator`]).
    Single,
    /// One counter row per secondary key ([`KeyedHiLoAllocator`]).
    RowPerTable,
}

impl AllocatorKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Single => "HiLoAllocator",
            Self::RowPerTable => "KeyedHiLoAllocator",
        }
    }
}

/// The configuration fingerprint that deduplicates allocator instances.
///
/// Equality is field-wise over `(kind, name, schema, key)`; two identities
/// with equal fields refer to the same logical allocator regardless of where
/// they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocatorIdentity {
    kind: AllocatorKind,
    name: String,
    schema: Option<String>,
    key: Option<String>,
}

impl AllocatorIdentity {
    /// Identity of the unkeyed allocator for `config`.
    pub fn single(config: &AllocatorConfig) -> Self {
        Self {
            kind: AllocatorKind::Single,
            name: config.table_name(SINGLE_HILO_TABLE),
            schema: config.schema().map(str::to_owned),
            key: None,
        }
    }

    /// Identity of the per-key child allocator for `config` bound to `key`.
    pub fn keyed(config: &AllocatorConfig, key: &str) -> Self {
        Self {
            kind: AllocatorKind::RowPerTable,
            name: config.table_name(ROW_PER_TABLE_HILO_TABLE),
            schema: config.schema().map(str::to_owned),
            key: Some(key.to_owned()),
        }
    }

    /// The counter-table layout this identity refers to.
    pub fn kind(&self) -> AllocatorKind {
        self.kind
    }

    /// The counter table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema qualifier, if any.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The secondary key, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Serialized cache key: the kind plus every set field, ordered by
    /// parameter name (`name`, `schema`, `table_name`), dot-joined, unset
    /// fields skipped.
    pub fn cache_key(&self) -> String {
        let mut parts = vec![self.kind.as_str(), self.name.as_str()];
        if let Some(schema) = self.schema.as_deref() {
            parts.push(schema);
        }
        if let Some(key) = self.key.as_deref() {
            parts.push(key);
        }
        parts.join(".")
    }
}

struct Entry<B>
where
    B: CounterBackend,
{
    block: i64,
    allocator: Arc<HiLoAllocator<B>>,
}

struct Shared<B>
where
    B: CounterBackend,
{
    backend: B,
    entries: Mutex<HashMap<String, Entry<B>>>,
}

/// Process-wide cache of allocator instances, keyed by identity.
///
/// Cheap to clone; clones share the cache and the backend handle. Pure
/// memoization — resolving never touches the counter table.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use hilo::{AllocatorConfig, AllocatorRegistry, MemoryBackend};
///
/// let registry = AllocatorRegistry::new(MemoryBackend::new());
/// let config = AllocatorConfig::new();
///
/// // Equal configurations resolve to the same instance.
/// let a = registry.allocator(&config)?;
/// let b = registry.allocator(&config)?;
/// assert!(Arc::ptr_eq(&a, &b));
/// # Ok::<(), hilo::ConfigConflict>(())
/// ```
pub struct AllocatorRegistry<B>
where
    B: CounterBackend,
{
    shared: Arc<Shared<B>>,
}

impl<B> Clone for AllocatorRegistry<B>
where
    B: CounterBackend,
{
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<B> AllocatorRegistry<B>
where
    B: CounterBackend,
{
    /// Creates an empty registry over a backend handle.
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolves (or constructs) the shared unkeyed allocator for `config`.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigConflict`] if the identity was already registered
    /// with a different block size.
    pub fn allocator(
        &self,
        config: &AllocatorConfig,
    ) -> Result<Arc<HiLoAllocator<B>>, ConfigConflict> {
        self.resolve(&AllocatorIdentity::single(config), config.block())
    }

    /// Creates a keyed allocator template for `config`.
    ///
    /// Templates are cheap and not themselves cached; the per-key children
    /// they bind are, so equal templates binding the same key still share
    /// one child.
    pub fn template(&self, config: &AllocatorConfig) -> KeyedHiLoAllocator<B> {
        KeyedHiLoAllocator::new(self.clone(), config.clone())
    }

    /// Resolves `identity` to its shared allocator instance.
    ///
    /// The first call with a given identity constructs and caches the
    /// instance; later calls with an equal identity return the cached one,
    /// guaranteeing a single authoritative `(hi, lo)` cursor per identity
    /// process-wide. Entries live for the registry's lifetime.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigConflict`] if `identity` is cached with a block
    /// size other than `block`.
    pub fn resolve(
        &self,
        identity: &AllocatorIdentity,
        block: i64,
    ) -> Result<Arc<HiLoAllocator<B>>, ConfigConflict> {
        let cache_key = identity.cache_key();
        let mut entries = self.shared.entries.lock();

        if let Some(entry) = entries.get(&cache_key) {
            if entry.block != block {
                return Err(ConfigConflict {
                    identity: cache_key,
                    existing: entry.block,
                    requested: block,
                });
            }
            return Ok(entry.allocator.clone());
        }

        let schema = identity.schema().map(str::to_owned);
        let store = match identity.key() {
            Some(key) => CounterStore::keyed(TableSpec::keyed(identity.name(), schema), key),
            None => CounterStore::single(TableSpec::single(identity.name(), schema)),
        };
        let allocator = Arc::new(HiLoAllocator::with_store(
            self.shared.backend.clone(),
            store,
            block,
        ));
        entries.insert(
            cache_key,
            Entry {
                block,
                allocator: allocator.clone(),
            },
        );
        Ok(allocator)
    }
}
