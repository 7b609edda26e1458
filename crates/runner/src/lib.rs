//! Agent session execution boundary.
//!
//! The scheduler core never talks to a coding agent directly; it issues
//! start requests through [`AgentRunner`] and consumes the typed
//! [`AgentEvent`](agentboard_core::AgentEvent) stream the runner emits.

#![warn(missing_docs)]

mod trait_;
mod command;

pub use trait_::{AgentRunner, Result, RunnerError};
pub use command::{CommandConfig, CommandRunner};
