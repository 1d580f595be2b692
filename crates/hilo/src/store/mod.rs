mod counter;
mod interface;
mod memory;

pub use counter::*;
pub use interface::*;
pub use memory::*;
