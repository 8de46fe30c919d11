// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types shared across the crate.
//!
//! Errors are split by the phase that raises them:
//!
//! * [`ConfigError`] - reading and decoding cluster or metadata documents
//! * [`BuildError`] - turning a decoded cluster into a validated graph set
//! * [`ExecutionError`] - looking up and running a graph
//! * [`ProcessorError`] / [`PortError`] - raised by task bodies and their port access

mod build;
mod config;
mod execution;
mod processor;

pub use build::BuildError;
pub use config::ConfigError;
pub use execution::ExecutionError;
pub use processor::{PortError, ProcessorError};
