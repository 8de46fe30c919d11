pub mod binding;
pub mod cluster_context;
pub mod data_context;
pub mod evaluator;
pub mod events;
pub(crate) mod graph_context;
pub mod manager;
pub mod scope;
pub(crate) mod vertex_context;
#[cfg(test)]
pub(crate) mod stub;

pub use binding::{PortBinder, PortIo};
pub use cluster_context::{ClusterContext, ClusterContextPool, PooledContext};
pub use data_context::{DataContext, DataKey, DataValue};
pub use evaluator::{EvalError, Evaluator, ExprEvaluator};
pub use events::{Event, EventSink};
pub use manager::{ClusterManager, ClusterManagerBuilder};
pub use scope::RunScope;
pub use vertex_context::VertexOutcome;
