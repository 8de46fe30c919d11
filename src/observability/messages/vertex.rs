// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the life of a single vertex at run time: gate checks and
//! processor results.

use crate::engine::EvalError;
use crate::errors::ProcessorError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A gate vetoed the vertex for this run.
///
/// # Log Level
/// `debug!` - routine routing, not a failure
pub struct VertexSkipped<'a> {
    pub graph: &'a str,
    pub vertex: &'a str,
    pub reason: &'a str,
}

impl Display for VertexSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipped vertex '{}' in graph '{}': {}",
            self.vertex, self.graph, self.reason
        )
    }
}

impl StructuredLog for VertexSkipped<'_> {
    fn log(&self) {
        tracing::debug!(
            graph = self.graph,
            vertex = self.vertex,
            reason = self.reason,
            "{}", self
        );
    }
}

/// A gate expression could not be evaluated; the gate passes.
///
/// # Log Level
/// `warn!`
pub struct ExpressionFailed<'a> {
    pub vertex: &'a str,
    pub error: &'a EvalError,
}

impl Display for ExpressionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex '{}' gate not evaluated: {}", self.vertex, self.error)
    }
}

impl StructuredLog for ExpressionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            vertex = self.vertex,
            expression = %self.error.expression,
            error = %self.error,
            "{}", self
        );
    }
}

/// A processor or called subgraph reported an error.
///
/// # Log Level
/// `warn!` - the run continues along error edges
pub struct ProcessorFailed<'a> {
    pub graph: &'a str,
    pub vertex: &'a str,
    pub error: &'a ProcessorError,
}

impl Display for ProcessorFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' in graph '{}' failed: {}",
            self.vertex, self.graph, self.error
        )
    }
}

impl StructuredLog for ProcessorFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            graph = self.graph,
            vertex = self.vertex,
            code = self.error.code,
            error = %self.error,
            "{}", self
        );
    }
}
