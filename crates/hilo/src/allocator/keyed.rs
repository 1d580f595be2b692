use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    allocator::HiLoAllocator,
    config::AllocatorConfig,
    error::{ConfigConflict, Result},
    registry::{AllocatorIdentity, AllocatorRegistry},
    schema::{ROW_PER_TABLE_HILO_TABLE, TableSpec},
    store::CounterBackend,
};

/// A keyed (row-per-table) hi/lo allocator template.
///
/// Many logically distinct id spaces share one physical counter table: one
/// row per secondary key, each with its own independent `(hi, lo)` sequence
/// starting dense from 1. The API is two-phase: create the template at
/// schema-definition time via
/// [`AllocatorRegistry::template`](crate::registry::AllocatorRegistry::template),
/// then [`bind`](Self::bind) it to a concrete table key at table-creation
/// time to get the per-key child allocator.
///
/// ## See Also
/// - [`HiLoAllocator`] for the single-sequence form
///
/// # Example
/// ```
/// use hilo::{AllocatorConfig, AllocatorRegistry, MemoryBackend};
///
/// let registry = AllocatorRegistry::new(MemoryBackend::new());
/// let keyed = registry.template(&AllocatorConfig::new());
///
/// let orders = keyed.bind("orders")?;
/// let users = keyed.bind("users")?;
///
/// // Each key gets its own dense sequence.
/// assert_eq!(orders.next_id()?, 1);
/// assert_eq!(orders.next_id()?, 2);
/// assert_eq!(users.next_id()?, 1);
/// # Ok::<(), hilo::Error<hilo::MemoryUnavailable>>(())
/// ```
pub struct KeyedHiLoAllocator<B>
where
    B: CounterBackend,
{
    registry: AllocatorRegistry<B>,
    config: AllocatorConfig,
    children: Mutex<HashMap<String, Arc<HiLoAllocator<B>>>>,
}

impl<B> KeyedHiLoAllocator<B>
where
    B: CounterBackend,
{
    pub(crate) fn new(registry: AllocatorRegistry<B>, config: AllocatorConfig) -> Self {
        Self {
            registry,
            config,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// The declared keyed counter table shared by all children.
    pub fn table(&self) -> TableSpec {
        TableSpec::keyed(
            self.config.table_name(ROW_PER_TABLE_HILO_TABLE),
            self.config.schema().map(str::to_owned),
        )
    }

    /// The configuration this template was created with.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Binds the template to one table key.
    ///
    /// The per-key child is resolved through the registry, so equal
    /// `(name, schema, key)` bindings — from this template or any other —
    /// share one child and therefore one `(hi, lo)` cursor. The child keeps
    /// this template's table name, schema, and block size.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigConflict`] if the key's identity was already
    /// registered with a different block size.
    pub fn bind(
        &self,
        table_key: impl Into<String>,
    ) -> core::result::Result<Arc<HiLoAllocator<B>>, ConfigConflict> {
        let table_key = table_key.into();
        let mut children = self.children.lock();
        if let Some(child) = children.get(&table_key) {
            return Ok(child.clone());
        }
        let identity = AllocatorIdentity::keyed(&self.config, &table_key);
        let child = self.registry.resolve(&identity, self.config.block())?;
        children.insert(table_key, child.clone());
        Ok(child)
    }

    /// Returns the next identifier for `table_key`.
    ///
    /// The child allocator is lazily bound the first time a key is seen;
    /// later calls for that key delegate to the cached child. Distinct keys
    /// never share state or block boundaries.
    ///
    /// # Errors
    ///
    /// Propagates [`bind`](Self::bind) conflicts and the child's refill
    /// errors.
    pub fn next_id(&self, table_key: &str) -> Result<i64, B::Error> {
        let child = self.bind(table_key)?;
        child.next_id()
    }
}
