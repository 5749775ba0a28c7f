//! Small helpers shared across the ivebot crates.

pub mod error;
pub mod time;

pub use error::FromMessage;
