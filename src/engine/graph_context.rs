//! Cascading wavefront scheduler for one graph.
//!
//! Every vertex whose wait count is zero starts in its own task. When a
//! vertex finishes, it reports its outcome to each successor; successors
//! whose wait count reaches zero form the next wave, started from the task
//! that released them. A wave returns only after every vertex it started,
//! and everything those released, has finished.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinSet;

use crate::config::ProcessorRegistry;
use crate::engine::scope::RunScope;
use crate::engine::vertex_context::{VertexContext, VertexOutcome};
use crate::errors::BuildError;
use crate::graph::Graph;
use crate::observability::messages::engine::{VertexExecutionFailed, VertexTaskPanicked};
use crate::observability::messages::StructuredLog;

pub(crate) struct GraphContext {
    graph: Arc<Graph>,
    vertices: Vec<VertexContext>,
    index: HashMap<String, usize>,
}

impl GraphContext {
    pub(crate) fn new(graph: Arc<Graph>, registry: &ProcessorRegistry) -> Result<Self, BuildError> {
        let mut vertices = Vec::with_capacity(graph.vertices().len());
        let mut index = HashMap::with_capacity(graph.vertices().len());
        for vertex in graph.vertices() {
            index.insert(vertex.id.clone(), vertices.len());
            vertices.push(VertexContext::new(&graph.name, Arc::clone(vertex), registry)?);
        }
        Ok(Self {
            graph,
            vertices,
            index,
        })
    }

    /// Runs the graph to completion against `scope`'s data context.
    pub(crate) async fn execute(self: &Arc<Self>, scope: Arc<RunScope>) {
        for vertex in &self.vertices {
            if let Some(binder) = vertex.binder() {
                for key in binder.input_keys().chain(binder.output_keys()) {
                    scope.data.register(key.clone());
                }
            }
        }
        let ready: Vec<usize> = self
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_ready())
            .map(|(idx, _)| idx)
            .collect();
        Arc::clone(self).execute_ready(scope, ready).await;
    }

    fn execute_ready(self: Arc<Self>, scope: Arc<RunScope>, ready: Vec<usize>) -> BoxFuture<'static, ()> {
        async move {
            if ready.is_empty() {
                return;
            }
            let mut tasks = JoinSet::new();
            for idx in ready {
                let graph = Arc::clone(&self);
                let scope = Arc::clone(&scope);
                tasks.spawn(async move {
                    let vertex = &graph.vertices[idx];
                    if let Err(err) = vertex.execute(&scope).await {
                        VertexExecutionFailed {
                            graph: &graph.graph.name,
                            vertex: &vertex.vertex().id,
                            error: &err,
                        }
                        .log();
                    }
                    graph.on_vertex_done(scope, idx).await;
                });
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    VertexTaskPanicked {
                        graph: &self.graph.name,
                        error: &err,
                    }
                    .log();
                }
            }
        }
        .boxed()
    }

    async fn on_vertex_done(self: Arc<Self>, scope: Arc<RunScope>, idx: usize) {
        let done = &self.vertices[idx];
        let outcome = done.outcome();
        let mut ready = Vec::new();
        for successor in done.vertex().successors() {
            let Some(&next) = self.index.get(successor) else {
                panic!(
                    "successor '{successor}' of vertex '{}' missing from graph '{}'",
                    done.vertex().id,
                    self.graph.name
                );
            };
            if self.vertices[next].set_dependency_result(&done.vertex().id, outcome.clone()) == 0 {
                ready.push(next);
            }
        }
        Arc::clone(&self).execute_ready(scope, ready).await;
    }

    /// The outcome each vertex recorded in the last run.
    #[cfg(test)]
    pub(crate) fn outcomes(&self) -> HashMap<String, VertexOutcome> {
        self.vertices
            .iter()
            .map(|v| (v.vertex().id.clone(), v.outcome()))
            .collect()
    }

    pub(crate) fn reset(&self) {
        for vertex in &self.vertices {
            vertex.reset();
        }
    }
}
