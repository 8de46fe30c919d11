//! Built graph model: vertices with resolved edges, validated graphs,
//! clusters of graphs, and their DOT rendering.

mod cluster;
mod dag_config;
mod dot;
#[allow(clippy::module_inception)]
mod graph;
mod validation;
mod vertex;

pub use cluster::Cluster;
pub use dag_config::DagConfig;
pub use graph::Graph;
pub use vertex::{ResultKind, Unit, Vertex};
