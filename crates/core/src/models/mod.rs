//! Data models for Parlay

mod peer;
mod registration;

pub use peer::*;
pub use registration::*;
