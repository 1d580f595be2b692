/// Default number of ids issued per fetched `hi` block.
///
/// Larger blocks mean fewer counter-table round trips but bigger gaps when a
/// process restarts with part of a block unissued.
pub const DEFAULT_BLOCK: i64 = 10_000;

/// Configuration surface of one allocator.
///
/// Everything is optional: an empty config yields the default table name for
/// the allocator kind, no schema qualifier, and a block of
/// [`DEFAULT_BLOCK`]. Two constructions with equal configuration refer to
/// the same logical allocator; resolve through
/// [`AllocatorRegistry`](crate::AllocatorRegistry) to get the shared
/// instance.
///
/// # Example
/// ```
/// use hilo::{AllocatorConfig, DEFAULT_BLOCK};
///
/// let config = AllocatorConfig::new().with_schema("accounting");
/// assert_eq!(config.schema(), Some("accounting"));
/// assert_eq!(config.block(), DEFAULT_BLOCK);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocatorConfig {
    name: Option<String>,
    schema: Option<String>,
    block: i64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            name: None,
            schema: None,
            block: DEFAULT_BLOCK,
        }
    }
}

impl AllocatorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the counter table name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the schema/namespace qualifier for the counter table.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Overrides the block size.
    ///
    /// Changing the block size on an existing deployment changes the
    /// numbering scheme but not correctness: old ids stay valid and new ones
    /// continue from the current counter value.
    ///
    /// # Panics
    ///
    /// Panics if `block` is not positive.
    pub fn with_block(mut self, block: i64) -> Self {
        assert!(block > 0, "block size must be positive, got {block}");
        self.block = block;
        self
    }

    /// Counter table name override, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Schema qualifier, if any.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Ids issued per fetched `hi` block.
    pub fn block(&self) -> i64 {
        self.block
    }

    pub(crate) fn table_name(&self, default: &str) -> String {
        self.name.clone().unwrap_or_else(|| default.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AllocatorConfig::new();
        assert_eq!(config.name(), None);
        assert_eq!(config.schema(), None);
        assert_eq!(config.block(), 10_000);
        assert_eq!(config.table_name("single_hilo"), "single_hilo");
    }

    #[test]
    fn overrides_apply() {
        let config = AllocatorConfig::new()
            .with_name("ids")
            .with_schema("app")
            .with_block(64);
        assert_eq!(config.table_name("single_hilo"), "ids");
        assert_eq!(config.schema(), Some("app"));
        assert_eq!(config.block(), 64);
    }

    #[test]
    #[should_panic(expected = "block size must be positive")]
    fn zero_block_is_rejected() {
        let _ = AllocatorConfig::new().with_block(0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let config = AllocatorConfig::new().with_name("ids").with_block(512);
        let json = serde_json::to_string(&config).unwrap();
        let back: AllocatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
