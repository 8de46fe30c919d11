//! Entry points: loading clusters and executing graphs.
//!
//! A [`ClusterManager`] owns the loaded clusters and everything runs share:
//! the processor registry, the expression evaluator, the timing event sink
//! and the default data context. It is cheap to clone; clones share state.
//!
//! # Example
//! ```text
//! let mut registry = ProcessorRegistry::new();
//! registry.register("fetch", || Box::new(Fetch::default()));
//!
//! let manager = ClusterManager::builder(registry).event_capacity(1024).build();
//! manager.load_file("configs/search.toml")?;
//!
//! let data = Arc::new(DataContext::new());
//! data.set_value("query", "rust".to_string());
//! manager
//!     .execute(CancellationToken::new(), "search.toml", "main", Some(data), None)
//!     .await?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::DEFAULT_EVENT_CAPACITY;
use crate::config::{load_cluster_content, load_cluster_file, ClusterConfig, Codec, Params, ProcessorRegistry};
use crate::engine::cluster_context::ClusterContextPool;
use crate::engine::data_context::DataContext;
use crate::engine::evaluator::{Evaluator, ExprEvaluator};
use crate::engine::events::{Event, EventSink};
use crate::engine::scope::RunScope;
use crate::errors::{ConfigError, ExecutionError};
use crate::graph::Cluster;
use crate::observability::messages::engine::{
    ClusterLoaded, ExecutionCompleted, ExecutionFailed, ExecutionStarted,
};
use crate::observability::messages::StructuredLog;

struct LoadedCluster {
    cluster: Arc<Cluster>,
    pool: ClusterContextPool,
}

struct ManagerInner {
    clusters: RwLock<HashMap<String, Arc<LoadedCluster>>>,
    registry: Arc<ProcessorRegistry>,
    evaluator: Arc<dyn Evaluator>,
    events: EventSink,
    defaults: Arc<DataContext>,
}

/// Loads clusters and runs their graphs.
#[derive(Clone)]
pub struct ClusterManager {
    inner: Arc<ManagerInner>,
}

impl ClusterManager {
    /// A manager with the default evaluator, event capacity and empty defaults.
    pub fn new(registry: ProcessorRegistry) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: ProcessorRegistry) -> ClusterManagerBuilder {
        ClusterManagerBuilder {
            registry,
            evaluator: Arc::new(ExprEvaluator),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            defaults: DataContext::new(),
        }
    }

    /// Loads a cluster file, named after the file, replacing any cluster of that name.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let (name, config) = load_cluster_file(path)?;
        self.install(&name, config)
    }

    /// Decodes `content` with `codec` and loads it as cluster `name`.
    pub fn load(&self, name: &str, content: &[u8], codec: &dyn Codec) -> Result<(), ConfigError> {
        let config = load_cluster_content(content, codec)?;
        self.install(name, config)
    }

    /// Builds `config` against the registry's metadata and makes it executable.
    ///
    /// The context pool is filled before the cluster becomes visible, so a
    /// failure leaves any previously loaded cluster of the same name in place.
    pub fn install(&self, name: &str, config: ClusterConfig) -> Result<(), ConfigError> {
        let metas = self.inner.registry.generate_metas();
        let cluster = Arc::new(Cluster::build(name, config, &metas)?);
        let pool = ClusterContextPool::new(Arc::clone(&cluster), Arc::clone(&self.inner.registry))?;

        ClusterLoaded {
            cluster: name,
            graphs: cluster.graphs().len(),
            pool_size: pool.idle(),
        }
        .log();

        self.inner
            .clusters
            .write()
            .insert(name.to_string(), Arc::new(LoadedCluster { cluster, pool }));
        Ok(())
    }

    pub fn cluster(&self, name: &str) -> Option<Arc<Cluster>> {
        self.inner
            .clusters
            .read()
            .get(name)
            .map(|loaded| Arc::clone(&loaded.cluster))
    }

    /// Names of all loaded clusters, sorted.
    pub fn cluster_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.clusters.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Contexts currently idle in a cluster's pool.
    pub fn idle_contexts(&self, name: &str) -> Option<usize> {
        self.inner.clusters.read().get(name).map(|loaded| loaded.pool.idle())
    }

    /// Runs `graph` of `cluster`.
    ///
    /// `data` is shared with the caller, so values produced by the run stay
    /// visible after it returns; `None` runs against a fresh context. Task
    /// failures do not make this fail: they steer which vertices run.
    ///
    /// The run is driven on its own task. Dropping the returned future stops
    /// waiting for it but does not stop it: started vertices finish, and the
    /// pooled context is returned only once the whole graph has settled.
    pub async fn execute(
        &self,
        cancel: CancellationToken,
        cluster: &str,
        graph: &str,
        data: Option<Arc<DataContext>>,
        params: Option<Params>,
    ) -> Result<(), ExecutionError> {
        let loaded = self
            .inner
            .clusters
            .read()
            .get(cluster)
            .cloned()
            .ok_or_else(|| ExecutionError::ClusterNotFound(cluster.to_string()))?;

        let scope = RunScope::new(cancel, data.unwrap_or_default(), params, self.clone());
        let run = tokio::spawn(run_graph(loaded, cluster.to_string(), graph.to_string(), scope));
        match run.await {
            Ok(result) => result,
            Err(err) => {
                let error = ExecutionError::RunAborted {
                    cluster: cluster.to_string(),
                    graph: graph.to_string(),
                    reason: err.to_string(),
                };
                ExecutionFailed {
                    cluster,
                    graph,
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    pub fn events(&self) -> &EventSink {
        &self.inner.events
    }

    /// Takes the receiving end of the timing event channel. Succeeds once.
    pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<Event>> {
        self.inner.events.take_receiver()
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.inner.registry
    }

    pub(crate) fn evaluator(&self) -> &dyn Evaluator {
        self.inner.evaluator.as_ref()
    }

    /// Fallback values for extern inputs missing from a run's data context.
    pub fn defaults(&self) -> &DataContext {
        &self.inner.defaults
    }
}

async fn run_graph(
    loaded: Arc<LoadedCluster>,
    cluster: String,
    graph: String,
    scope: RunScope,
) -> Result<(), ExecutionError> {
    let started = ExecutionStarted {
        cluster: &cluster,
        graph: &graph,
    };
    let span = started.span("execute");
    started.log();
    let start = Instant::now();

    let result = async {
        let context = loaded
            .pool
            .get()
            .map_err(|source| ExecutionError::ContextCreation {
                cluster: cluster.clone(),
                source,
            })?;
        context.execute(&graph, scope).await
    }
    .instrument(span)
    .await;

    match &result {
        Ok(()) => ExecutionCompleted {
            cluster: &cluster,
            graph: &graph,
            duration: start.elapsed(),
        }
        .log(),
        Err(error) => ExecutionFailed {
            cluster: &cluster,
            graph: &graph,
            error,
        }
        .log(),
    }
    result
}

/// Configures a [`ClusterManager`].
pub struct ClusterManagerBuilder {
    registry: ProcessorRegistry,
    evaluator: Arc<dyn Evaluator>,
    event_capacity: usize,
    defaults: DataContext,
}

impl ClusterManagerBuilder {
    pub fn evaluator<E: Evaluator + 'static>(mut self, evaluator: E) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Values consulted for extern inputs the per-run context does not hold.
    pub fn defaults(mut self, defaults: DataContext) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> ClusterManager {
        ClusterManager {
            inner: Arc::new(ManagerInner {
                clusters: RwLock::new(HashMap::new()),
                registry: Arc::new(self.registry),
                evaluator: self.evaluator,
                events: EventSink::new(self.event_capacity),
                defaults: Arc::new(self.defaults),
            }),
        }
    }
}
