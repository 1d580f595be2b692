mod allocator;
mod config;
mod error;
mod registry;
mod schema;
mod store;

pub use crate::allocator::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::registry::*;
pub use crate::schema::*;
pub use crate::store::*;
