pub mod config;
pub mod debug;
pub mod transcript;

pub use config::*;
pub use debug::*;
pub use transcript::*;
