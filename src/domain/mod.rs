pub mod config;
pub mod normalize;
pub mod types;
pub mod window;

pub use config::*;
pub use normalize::*;
pub use types::*;
pub use window::*;
