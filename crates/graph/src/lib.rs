//! Dependency graph resolution for features.
//!
//! Pure functions over a feature snapshot: no I/O, no shared state. The
//! scheduler feeds every mutation back in as a fresh snapshot; nothing here
//! is patched in place.

#![warn(missing_docs)]

mod resolver;

pub use resolver::{resolve, DependencyReport};
