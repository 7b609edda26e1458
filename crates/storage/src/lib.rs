//! Feature persistence for agentboard.
//!
//! The scheduler core only ever uses the narrow [`FeatureStore`] contract;
//! backends can be swapped without touching scheduling logic.

#![warn(missing_docs)]

mod trait_;
mod json;
mod memory;

pub use trait_::{FeatureStore, Result, StoreError};
pub use json::JsonFeatureStore;
pub use memory::MemoryFeatureStore;
