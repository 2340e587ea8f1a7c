pub mod control;
pub mod search;
pub mod strategy;

pub use control::*;
pub use search::*;
pub use strategy::*;
