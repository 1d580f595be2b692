mod block;
mod interface;
mod keyed;
#[cfg(test)]
mod tests;

pub use block::*;
pub use interface::*;
pub use keyed::*;
