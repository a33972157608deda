pub mod prediction;
pub mod ticket;

pub use prediction::*;
pub use ticket::*;
