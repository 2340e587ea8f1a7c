pub mod events;
pub mod impact;
pub mod sentiment;

pub use events::*;
pub use impact::*;
pub use sentiment::*;
