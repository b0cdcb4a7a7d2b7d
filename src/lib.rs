pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod monitor;
pub mod reporter;
pub mod sender;
pub mod signal;
pub mod stats;

pub use error::{Error, Result};
