use std::collections::HashMap;
use std::sync::Arc;

use crate::config::consts::DEFAULT_CONTEXT_POOL_SIZE;
use crate::config::{index_metas, ClusterConfig, ConfigSetting, OperatorMeta};
use crate::errors::BuildError;
use crate::graph::graph::{BuildScope, Graph};
use crate::observability::messages::graph::GraphShadowed;
use crate::observability::messages::StructuredLog;

/// A built, validated set of graphs sharing config settings.
///
/// Clusters are immutable once built; every context created from one shares
/// it through an `Arc`.
#[derive(Debug)]
pub struct Cluster {
    pub name: String,
    pub desc: String,
    pub strict_dsl: bool,
    pub default_context_pool_size: usize,
    pub config_settings: Vec<ConfigSetting>,
    graphs: Vec<Arc<Graph>>,
    graph_index: HashMap<String, usize>,
}

impl Cluster {
    /// Builds every graph of `config` against the given processor metadata.
    ///
    /// Graphs sharing a name must differ in `expect_version`; of those, the
    /// one with the highest `priority` is kept. Ties keep the earlier one.
    pub fn build(name: &str, config: ClusterConfig, metas: &[OperatorMeta]) -> Result<Self, BuildError> {
        if config.graph.is_empty() {
            return Err(BuildError::EmptyCluster {
                cluster: name.to_string(),
            });
        }

        let mut chosen: Vec<usize> = Vec::new();
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (idx, graph) in config.graph.iter().enumerate() {
            if let Some(&slot) = by_name.get(graph.name.as_str()) {
                let existing = &config.graph[chosen[slot]];
                if existing.expect_version == graph.expect_version {
                    return Err(BuildError::DuplicateGraph {
                        graph: graph.name.clone(),
                        expect_version: graph.expect_version.clone(),
                    });
                }
                if graph.priority <= existing.priority {
                    GraphShadowed {
                        graph: &graph.name,
                        expect_version: &graph.expect_version,
                        winner: &existing.expect_version,
                    }
                    .log();
                    continue;
                }
                GraphShadowed {
                    graph: &existing.name,
                    expect_version: &existing.expect_version,
                    winner: &graph.expect_version,
                }
                .log();
                chosen[slot] = idx;
            } else {
                by_name.insert(graph.name.as_str(), chosen.len());
                chosen.push(idx);
            }
        }

        let metas = index_metas(metas);
        let scope = BuildScope {
            cluster: name,
            config_settings: &config.config_setting,
            metas: &metas,
        };
        let mut graphs = Vec::with_capacity(chosen.len());
        let mut graph_index = HashMap::with_capacity(chosen.len());
        for idx in chosen {
            let graph = Graph::build(&config.graph[idx], &scope)?;
            graph_index.insert(graph.name.clone(), graphs.len());
            graphs.push(Arc::new(graph));
        }

        let default_context_pool_size = match config.default_context_pool_size {
            0 => DEFAULT_CONTEXT_POOL_SIZE,
            size => size,
        };

        Ok(Cluster {
            name: name.to_string(),
            desc: config.desc,
            strict_dsl: config.strict_dsl,
            default_context_pool_size,
            config_settings: config.config_setting,
            graphs,
            graph_index,
        })
    }

    pub fn graph(&self, name: &str) -> Option<&Arc<Graph>> {
        self.graph_index.get(name).map(|&idx| &self.graphs[idx])
    }

    /// Kept graphs, in declaration order.
    pub fn graphs(&self) -> &[Arc<Graph>] {
        &self.graphs
    }

    /// Whether `name`, with any leading `!` removed, is a declared config setting.
    pub fn contains_config_setting(&self, name: &str) -> bool {
        let name = name.strip_prefix('!').unwrap_or(name);
        self.config_settings.iter().any(|s| s.name == name)
    }

    /// Renders the cluster in Graphviz DOT syntax.
    pub fn dump_dot(&self) -> String {
        crate::graph::dot::dump_cluster(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Codec, TomlCodec};

    fn decode(src: &str) -> ClusterConfig {
        TomlCodec.decode(src.as_bytes()).unwrap()
    }

    const VERSIONED: &str = r#"
[[config_setting]]
name = "flag"
cond = "x == 1"

[[graph]]
name = "main"
expect_version = "v1"
priority = 1
[[graph.vertex]]
id = "old"
cond = "true"

[[graph]]
name = "main"
expect_version = "v2"
priority = 5
[[graph.vertex]]
id = "new"
cond = "true"

[[graph]]
name = "main"
expect_version = "v3"
priority = 5
[[graph.vertex]]
id = "tied"
cond = "true"
"#;

    #[test]
    fn test_highest_priority_graph_wins() {
        let cluster = Cluster::build("c", decode(VERSIONED), &[]).unwrap();

        assert_eq!(cluster.graphs().len(), 1);
        let main = cluster.graph("main").unwrap();
        assert_eq!(main.expect_version, "v2", "ties keep the earlier graph");
        assert!(main.vertex("new").is_some());
        assert_eq!(cluster.default_context_pool_size, DEFAULT_CONTEXT_POOL_SIZE);
    }

    #[test]
    fn test_duplicate_graph_version_rejected() {
        let src = r#"
[[graph]]
name = "main"
[[graph.vertex]]
cond = "true"
[[graph]]
name = "main"
[[graph.vertex]]
cond = "true"
"#;
        let err = Cluster::build("c", decode(src), &[]).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateGraph { graph, .. } if graph == "main"));
    }

    #[test]
    fn test_empty_cluster_rejected() {
        let err = Cluster::build("c", ClusterConfig::default(), &[]).unwrap_err();
        assert_eq!(err, BuildError::EmptyCluster { cluster: "c".into() });
    }

    #[test]
    fn test_config_setting_lookup() {
        let cluster = Cluster::build("c", decode(VERSIONED), &[]).unwrap();
        assert!(cluster.contains_config_setting("flag"));
        assert!(cluster.contains_config_setting("!flag"));
        assert!(!cluster.contains_config_setting("other"));
    }

    #[test]
    fn test_explicit_pool_size_kept() {
        let src = "default_context_pool_size = 2\n[[graph]]\nname = \"g\"\n[[graph.vertex]]\ncond = \"true\"\n";
        let cluster = Cluster::build("c", decode(src), &[]).unwrap();
        assert_eq!(cluster.default_context_pool_size, 2);
    }
}
