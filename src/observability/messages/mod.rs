// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging, grouped by subsystem:
//!
//! * `graph` - cluster and graph build events
//! * `vertex` - gating, binding and processor events of a single vertex
//! * `engine` - loading, run lifecycle and scheduler events
//!
//! # Usage Pattern
//!
//! ```
//! use dagflow::observability::messages::engine::ExecutionStarted;
//! use dagflow::observability::messages::StructuredLog;
//!
//! let msg = ExecutionStarted {
//!     cluster: "search.toml",
//!     graph: "main",
//! };
//!
//! assert_eq!(msg.to_string(), "Executing graph 'main' of cluster 'search.toml'");
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod graph;
pub mod vertex;

/// Emits a message through `tracing` at the level its type dictates.
pub trait StructuredLog {
    fn log(&self);

    /// A span carrying the message's fields, for messages that open a scope.
    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}
