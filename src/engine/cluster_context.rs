use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::ProcessorRegistry;
use crate::engine::graph_context::GraphContext;
use crate::engine::scope::RunScope;
use crate::errors::{BuildError, ExecutionError};
use crate::graph::Cluster;
use crate::observability::messages::engine::ConfigSettingFailed;
use crate::observability::messages::StructuredLog;

/// One reusable set of graph contexts for a cluster.
///
/// A context serves one run at a time; the pool hands it out and takes it
/// back after [`ClusterContext::reset`].
pub struct ClusterContext {
    cluster: Arc<Cluster>,
    graphs: HashMap<String, Arc<GraphContext>>,
}

impl ClusterContext {
    pub fn new(cluster: Arc<Cluster>, registry: &ProcessorRegistry) -> Result<Self, BuildError> {
        let mut graphs = HashMap::with_capacity(cluster.graphs().len());
        for graph in cluster.graphs() {
            let context = GraphContext::new(Arc::clone(graph), registry)?;
            graphs.insert(graph.name.clone(), Arc::new(context));
        }
        Ok(Self { cluster, graphs })
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    /// Evaluates the cluster's config settings, then runs `graph`.
    ///
    /// Settings are evaluated only when run parameters are present; a
    /// setting whose expression fails or yields a non-boolean is left unset.
    pub async fn execute(&self, graph: &str, scope: RunScope) -> Result<(), ExecutionError> {
        let context = self.graphs.get(graph).ok_or_else(|| ExecutionError::GraphNotFound {
            cluster: self.cluster.name.clone(),
            graph: graph.to_string(),
        })?;

        if let Some(params) = &scope.params {
            let evaluator = scope.manager.evaluator();
            for setting in &self.cluster.config_settings {
                match evaluator.evaluate(&setting.cond, params) {
                    Ok(Value::Bool(value)) => scope.data.set_config_setting(setting.name.clone(), value),
                    Ok(_) => {}
                    Err(err) => ConfigSettingFailed {
                        cluster: &self.cluster.name,
                        setting: &setting.name,
                        error: &err,
                    }
                    .log(),
                }
            }
        }

        context.execute(Arc::new(scope)).await;
        Ok(())
    }

    /// Clears all per-run state so the context can serve another run.
    pub fn reset(&self) {
        for graph in self.graphs.values() {
            graph.reset();
        }
    }

    #[cfg(test)]
    pub(crate) fn graph_context(&self, graph: &str) -> Option<&Arc<GraphContext>> {
        self.graphs.get(graph)
    }
}

/// FIFO pool of cluster contexts.
///
/// Filled eagerly to the cluster's `default_context_pool_size`; when empty,
/// `get` builds a fresh context instead of waiting.
pub struct ClusterContextPool {
    cluster: Arc<Cluster>,
    registry: Arc<ProcessorRegistry>,
    free: Mutex<VecDeque<ClusterContext>>,
}

impl ClusterContextPool {
    pub fn new(cluster: Arc<Cluster>, registry: Arc<ProcessorRegistry>) -> Result<Self, BuildError> {
        let size = cluster.default_context_pool_size;
        let mut free = VecDeque::with_capacity(size);
        for _ in 0..size {
            free.push_back(ClusterContext::new(Arc::clone(&cluster), &registry)?);
        }
        Ok(Self {
            cluster,
            registry,
            free: Mutex::new(free),
        })
    }

    /// Takes a context from the front of the pool, or builds one.
    ///
    /// The returned guard resets the context and returns it to the pool when dropped.
    pub fn get(&self) -> Result<PooledContext<'_>, BuildError> {
        let pooled = self.free.lock().pop_front();
        let context = match pooled {
            Some(context) => context,
            None => ClusterContext::new(Arc::clone(&self.cluster), &self.registry)?,
        };
        Ok(PooledContext {
            pool: self,
            context: Some(context),
        })
    }

    pub fn put(&self, context: ClusterContext) {
        self.free.lock().push_back(context);
    }

    /// Number of contexts waiting in the pool.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// A context checked out of a [`ClusterContextPool`].
pub struct PooledContext<'a> {
    pool: &'a ClusterContextPool,
    context: Option<ClusterContext>,
}

impl Deref for PooledContext<'_> {
    type Target = ClusterContext;

    fn deref(&self) -> &ClusterContext {
        match &self.context {
            Some(context) => context,
            None => unreachable!("context is only taken on drop"),
        }
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            context.reset();
            self.pool.put(context);
        }
    }
}
