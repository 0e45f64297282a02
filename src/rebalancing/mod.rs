//! Deviation analysis and buy/sell suggestions against a target allocation.

mod engine;
mod models;
mod policy;

pub use engine::*;
pub use models::*;
pub use policy::*;
