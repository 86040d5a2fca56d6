//! Data models shared across the store, services, and API layers.
//!
//! All wire-facing types use camelCase field names to match the frontend contract.

mod account;
mod contract;

pub use account::*;
pub use contract::*;
