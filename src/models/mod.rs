pub mod catalog;
pub mod rule;
pub mod trade;

pub use catalog::*;
pub use rule::*;
pub use trade::*;
