// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for cluster loading and the run lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Clusters becoming executable
//! * Graph runs (start, completion, failure)
//! * Scheduler faults inside a run

use crate::engine::EvalError;
use crate::errors::ExecutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::task::JoinError;
use tracing::Span;

/// A cluster was built and its context pool filled.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ClusterLoaded<'a> {
    pub cluster: &'a str,
    pub graphs: usize,
    pub pool_size: usize,
}

impl Display for ClusterLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded cluster '{}': {} graphs, {} pooled contexts",
            self.cluster, self.graphs, self.pool_size
        )
    }
}

impl StructuredLog for ClusterLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            cluster = self.cluster,
            graphs = self.graphs,
            pool_size = self.pool_size,
            "{}", self
        );
    }
}

/// A graph run is starting.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use dagflow::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     cluster: "search.toml",
///     graph: "main",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionStarted<'a> {
    pub cluster: &'a str,
    pub graph: &'a str,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Executing graph '{}' of cluster '{}'",
            self.graph, self.cluster
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            cluster = self.cluster,
            graph = self.graph,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            cluster = self.cluster,
            graph = self.graph,
        )
    }
}

/// A graph run finished; individual vertices may still have failed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted<'a> {
    pub cluster: &'a str,
    pub graph: &'a str,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph '{}' of cluster '{}' completed in {:?}",
            self.graph, self.cluster, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            cluster = self.cluster,
            graph = self.graph,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// A graph run could not start.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ExecutionFailed<'a> {
    pub cluster: &'a str,
    pub graph: &'a str,
    pub error: &'a ExecutionError,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph '{}' of cluster '{}' failed: {}",
            self.graph, self.cluster, self.error
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            cluster = self.cluster,
            graph = self.graph,
            error = %self.error,
            "{}", self
        );
    }
}

/// A scheduled vertex could not run at all.
///
/// # Log Level
/// `warn!`
pub struct VertexExecutionFailed<'a> {
    pub graph: &'a str,
    pub vertex: &'a str,
    pub error: &'a ExecutionError,
}

impl Display for VertexExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Vertex '{}' in graph '{}' not executed: {}",
            self.vertex, self.graph, self.error
        )
    }
}

impl StructuredLog for VertexExecutionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            graph = self.graph,
            vertex = self.vertex,
            error = %self.error,
            "{}", self
        );
    }
}

/// A vertex task panicked; its successors are never released.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct VertexTaskPanicked<'a> {
    pub graph: &'a str,
    pub error: &'a JoinError,
}

impl Display for VertexTaskPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Vertex task in graph '{}' aborted: {}", self.graph, self.error)
    }
}

impl StructuredLog for VertexTaskPanicked<'_> {
    fn log(&self) {
        tracing::error!(
            graph = self.graph,
            panicked = self.error.is_panic(),
            error = %self.error,
            "{}", self
        );
    }
}

/// A config setting expression could not be evaluated; it stays false.
///
/// # Log Level
/// `warn!`
pub struct ConfigSettingFailed<'a> {
    pub cluster: &'a str,
    pub setting: &'a str,
    pub error: &'a EvalError,
}

impl Display for ConfigSettingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Config setting '{}' of cluster '{}' not evaluated: {}",
            self.setting, self.cluster, self.error
        )
    }
}

impl StructuredLog for ConfigSettingFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            cluster = self.cluster,
            setting = self.setting,
            error = %self.error,
            "{}", self
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_loaded_display() {
        let msg = ClusterLoaded {
            cluster: "search.toml",
            graphs: 2,
            pool_size: 10,
        };
        assert_eq!(
            msg.to_string(),
            "Loaded cluster 'search.toml': 2 graphs, 10 pooled contexts"
        );
    }

    #[test]
    fn test_execution_failed_display() {
        let error = ExecutionError::ClusterNotFound("missing".to_string());
        let msg = ExecutionFailed {
            cluster: "missing",
            graph: "main",
            error: &error,
        };
        assert!(msg.to_string().starts_with("Graph 'main' of cluster 'missing' failed: "));
    }
}
