use thiserror::Error;

use super::BuildError;

/// Errors returned by [`ClusterManager::execute`](crate::engine::ClusterManager::execute)
/// and the contexts it drives.
///
/// Task failures are not execution errors; they are recorded as vertex
/// outcomes and steer the rest of the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("cluster '{0}' is not loaded")]
    ClusterNotFound(String),

    #[error("graph '{graph}' not found in cluster '{cluster}'")]
    GraphNotFound { cluster: String, graph: String },

    /// A fresh cluster context could not be created for the pool.
    #[error("failed to create context for cluster '{cluster}': {source}")]
    ContextCreation {
        cluster: String,
        #[source]
        source: BuildError,
    },

    /// A vertex with neither a processor nor a subgraph reached execution.
    #[error("vertex '{vertex}' in graph '{graph}' has neither processor nor subgraph")]
    InvalidVertex { graph: String, vertex: String },

    /// The task driving the run ended without a result, e.g. on runtime shutdown.
    #[error("run of graph '{graph}' in cluster '{cluster}' aborted: {reason}")]
    RunAborted {
        cluster: String,
        graph: String,
        reason: String,
    },
}
