mod config;
mod error;
mod storage;

pub use config::*;
pub use error::*;
pub use storage::*;
