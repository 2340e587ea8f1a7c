pub mod ranker;
pub mod scorer;

pub use ranker::*;
pub use scorer::*;
