//! Graph construction.
//!
//! [`Graph::build`] turns a [`GraphConfig`] into a validated vertex set:
//!
//! 1. Assign vertex ids and resolve subgraph cluster references
//! 2. Check `expect` / `expect_config` and reject duplicate ids
//! 3. Complete ports from processor metadata and index producers by data id
//! 4. Wire data dependencies, declared dependencies and successor edges
//! 5. Check `select_args`, detect cycles, verify connectivity

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ConfigSetting, GraphConfig, OperatorMeta, VertexConfig};
use crate::errors::BuildError;
use crate::graph::validation::{find_cycle, verify_vertex};
use crate::graph::vertex::{ResultKind, Unit, Vertex};
use crate::observability::messages::graph::CircleDetected;
use crate::observability::messages::StructuredLog;

/// Cluster-level inputs shared by every graph build.
pub(crate) struct BuildScope<'a> {
    pub cluster: &'a str,
    pub config_settings: &'a [ConfigSetting],
    pub metas: &'a HashMap<String, OperatorMeta>,
}

impl BuildScope<'_> {
    fn contains_setting(&self, name: &str) -> bool {
        let name = name.strip_prefix('!').unwrap_or(name);
        self.config_settings.iter().any(|s| s.name == name)
    }
}

/// A validated graph.
#[derive(Debug)]
pub struct Graph {
    pub name: String,
    pub expect_version: String,
    pub priority: i64,
    vertices: Vec<Arc<Vertex>>,
    index: HashMap<String, usize>,
}

impl Graph {
    pub(crate) fn build(config: &GraphConfig, scope: &BuildScope<'_>) -> Result<Self, BuildError> {
        if config.vertex.is_empty() {
            return Err(BuildError::EmptyGraph {
                graph: config.name.clone(),
            });
        }
        let mut builder = GraphBuilder {
            graph: &config.name,
            scope,
            vertices: Vec::with_capacity(config.vertex.len()),
            index: HashMap::new(),
            producers: HashMap::new(),
            generated: 0,
        };
        builder.build_vertex_map(&config.vertex)?;
        builder.build_input_output()?;
        for (idx, declared) in config.vertex.iter().enumerate() {
            builder.build_edges(idx, declared)?;
        }
        builder.check_select_args()?;

        if let Some(cycle) = find_cycle(&builder.vertices) {
            CircleDetected {
                graph: &config.name,
                cycle: &cycle,
            }
            .log();
            return Err(BuildError::CircleExists {
                graph: config.name.clone(),
                cycle,
            });
        }
        for vertex in &builder.vertices {
            verify_vertex(&config.name, vertex)?;
        }

        Ok(Graph {
            name: config.name.clone(),
            expect_version: config.expect_version.clone(),
            priority: config.priority,
            vertices: builder.vertices.into_iter().map(Arc::new).collect(),
            index: builder.index,
        })
    }

    /// Vertices in declaration order.
    pub fn vertices(&self) -> &[Arc<Vertex>] {
        &self.vertices
    }

    pub fn vertex(&self, id: &str) -> Option<&Arc<Vertex>> {
        self.index.get(id).map(|&idx| &self.vertices[idx])
    }
}

struct GraphBuilder<'a> {
    graph: &'a str,
    scope: &'a BuildScope<'a>,
    vertices: Vec<Vertex>,
    index: HashMap<String, usize>,
    producers: HashMap<String, usize>,
    generated: usize,
}

impl GraphBuilder<'_> {
    fn build_vertex_map(&mut self, declared: &[VertexConfig]) -> Result<(), BuildError> {
        for cfg in declared {
            let mut vertex = Vertex::from_config(cfg);
            if vertex.id.is_empty() {
                if !vertex.processor.is_empty() {
                    vertex.id = vertex.processor.clone();
                } else {
                    vertex.id = format!("{}_{}", self.graph, self.generated);
                    vertex.id_generated = true;
                    self.generated += 1;
                }
            }
            if vertex.is_subgraph() && (vertex.cluster.is_empty() || vertex.cluster == ".") {
                vertex.cluster = self.scope.cluster.to_string();
            }
            if !vertex.expect.is_empty() && !vertex.expect_config.is_empty() {
                return Err(BuildError::ConflictingExpect {
                    graph: self.graph.to_string(),
                    vertex: vertex.id,
                });
            }
            if !vertex.expect_config.is_empty() && !self.scope.contains_setting(&vertex.expect_config) {
                return Err(BuildError::UnknownConfigSetting {
                    graph: self.graph.to_string(),
                    vertex: vertex.id,
                    setting: vertex.expect_config,
                });
            }
            if self.index.contains_key(&vertex.id) {
                return Err(BuildError::DuplicateVertex {
                    graph: self.graph.to_string(),
                    vertex: vertex.id,
                });
            }
            self.index.insert(vertex.id.clone(), self.vertices.len());
            self.vertices.push(vertex);
        }
        Ok(())
    }

    fn build_input_output(&mut self) -> Result<(), BuildError> {
        for idx in 0..self.vertices.len() {
            self.complete_ports(idx)?;
            let vertex = &mut self.vertices[idx];
            for unit in vertex.input.iter_mut().chain(vertex.output.iter_mut()) {
                if unit.field.is_empty() {
                    return Err(BuildError::EmptyUnitField {
                        graph: self.graph.to_string(),
                        vertex: vertex.id.clone(),
                    });
                }
                if unit.id.is_empty() {
                    unit.id = unit.field.clone();
                }
            }
            let outputs: Vec<String> = vertex.output.iter().map(|u| u.id.clone()).collect();
            for data in outputs {
                if let Some(&prev) = self.producers.get(&data) {
                    return Err(BuildError::DuplicateOutput {
                        graph: self.graph.to_string(),
                        data,
                        first: self.vertices[prev].id.clone(),
                        second: self.vertices[idx].id.clone(),
                    });
                }
                self.producers.insert(data, idx);
            }
        }
        Ok(())
    }

    /// Appends ports from metadata that the vertex does not declare, and
    /// carries metadata flags onto the ports it does declare.
    fn complete_ports(&mut self, idx: usize) -> Result<(), BuildError> {
        let vertex = &mut self.vertices[idx];
        let Some(meta) = self.scope.metas.get(&vertex.processor) else {
            if !vertex.is_subgraph() && vertex.cond.is_empty() {
                return Err(BuildError::MissingProcessor {
                    graph: self.graph.to_string(),
                    vertex: vertex.id.clone(),
                });
            }
            return Ok(());
        };

        for field in &meta.input {
            match vertex.input.iter_mut().find(|u| u.field == field.name) {
                Some(unit) => {
                    unit.is_extern |= field.flags.is_extern();
                    unit.is_in_out |= field.flags.is_in_out();
                    unit.is_map_input |= field.flags.is_aggregate();
                }
                None => vertex.input.push(Unit::from(field)),
            }
        }
        for field in &meta.output {
            if !vertex.output.iter().any(|u| u.field == field.name) {
                vertex.output.push(Unit {
                    id: field.name.clone(),
                    field: field.name.clone(),
                    ..Default::default()
                });
            }
        }
        Ok(())
    }

    fn build_edges(&mut self, idx: usize, declared: &VertexConfig) -> Result<(), BuildError> {
        self.build_data_deps(idx)?;
        self.build_deps(idx, &declared.deps_on_err, ResultKind::Err)?;
        self.build_deps(idx, &declared.deps_on_ok, ResultKind::Ok)?;
        self.build_deps(idx, &declared.deps, ResultKind::Any)?;
        self.build_successors(idx, &declared.successor_on_err, ResultKind::Err)?;
        self.build_successors(idx, &declared.successor_on_ok, ResultKind::Ok)?;
        self.build_successors(idx, &declared.successor, ResultKind::Any)
    }

    fn build_data_deps(&mut self, idx: usize) -> Result<(), BuildError> {
        let inputs = self.vertices[idx].input.clone();
        for unit in &inputs {
            if unit.aggregate.is_empty() && !unit.is_map_input {
                let producer = self.producers.get(&unit.id).copied();
                if unit.is_in_out && producer == Some(idx) {
                    continue;
                }
                self.depend_on_data(idx, producer, unit, &unit.id)?;
            } else {
                for source in &unit.aggregate {
                    let producer = self.producers.get(source).copied();
                    self.depend_on_data(idx, producer, unit, source)?;
                }
            }
        }
        Ok(())
    }

    fn depend_on_data(
        &mut self,
        idx: usize,
        producer: Option<usize>,
        unit: &Unit,
        data: &str,
    ) -> Result<(), BuildError> {
        match producer {
            Some(producer) => {
                self.depend(idx, producer, ResultKind::Any);
                Ok(())
            }
            None if unit.may_be_absent() => Ok(()),
            None => Err(BuildError::UnresolvedInput {
                graph: self.graph.to_string(),
                vertex: self.vertices[idx].id.clone(),
                data: data.to_string(),
            }),
        }
    }

    fn build_deps(&mut self, idx: usize, deps: &[String], kind: ResultKind) -> Result<(), BuildError> {
        for id in deps {
            let Some(&producer) = self.index.get(id) else {
                return Err(BuildError::UnresolvedDependency {
                    graph: self.graph.to_string(),
                    vertex: self.vertices[idx].id.clone(),
                    dependency: id.clone(),
                });
            };
            self.depend(idx, producer, kind);
        }
        Ok(())
    }

    fn build_successors(&mut self, idx: usize, successors: &[String], kind: ResultKind) -> Result<(), BuildError> {
        for id in successors {
            let Some(&dependent) = self.index.get(id) else {
                return Err(BuildError::UnresolvedSuccessor {
                    graph: self.graph.to_string(),
                    vertex: self.vertices[idx].id.clone(),
                    successor: id.clone(),
                });
            };
            self.depend(dependent, idx, kind);
        }
        Ok(())
    }

    /// Records that `dependent` waits on `producer` with the given expectation.
    /// A later edge between the same pair replaces the expectation.
    fn depend(&mut self, dependent: usize, producer: usize, kind: ResultKind) {
        let producer_id = self.vertices[producer].id.clone();
        let dependent_id = self.vertices[dependent].id.clone();
        self.vertices[dependent].deps.insert(producer_id, kind);
        self.vertices[producer].successors.insert(dependent_id);
    }

    fn check_select_args(&self) -> Result<(), BuildError> {
        for vertex in &self.vertices {
            for select in &vertex.select_args {
                if !self.scope.contains_setting(&select.match_setting) {
                    return Err(BuildError::UnknownConfigSetting {
                        graph: self.graph.to_string(),
                        vertex: vertex.id.clone(),
                        setting: select.match_setting.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldFlags, FieldMeta, TomlCodec, Codec};

    fn field(name: &str) -> FieldMeta {
        FieldMeta {
            name: name.into(),
            flags: FieldFlags::default(),
        }
    }

    fn flagged(name: &str, flags: FieldFlags) -> FieldMeta {
        FieldMeta {
            name: name.into(),
            flags,
        }
    }

    fn metas() -> HashMap<String, OperatorMeta> {
        let extern_flag = FieldFlags {
            is_extern: 1,
            ..Default::default()
        };
        let list = vec![
            OperatorMeta {
                name: "source".into(),
                input: vec![flagged("REQ", extern_flag.clone())],
                output: vec![field("Mid")],
            },
            OperatorMeta {
                name: "middle".into(),
                input: vec![field("Mid")],
                output: vec![field("ID")],
            },
            OperatorMeta {
                name: "sink".into(),
                input: vec![flagged(
                    "IDs",
                    FieldFlags {
                        is_aggregate: 1,
                        ..Default::default()
                    },
                )],
                output: vec![],
            },
            OperatorMeta {
                name: "counter".into(),
                input: vec![flagged(
                    "Acc",
                    FieldFlags {
                        is_in_out: 1,
                        ..Default::default()
                    },
                )],
                output: vec![field("Acc")],
            },
            OperatorMeta {
                name: "noop".into(),
                input: vec![],
                output: vec![],
            },
        ];
        list.into_iter().map(|m| (m.name.clone(), m)).collect()
    }

    fn settings() -> Vec<ConfigSetting> {
        vec![ConfigSetting {
            name: "flag".into(),
            cond: "x == 1".into(),
            processor: String::new(),
        }]
    }

    fn build(toml_src: &str) -> Result<Graph, BuildError> {
        let cfg = TomlCodec.decode(toml_src.as_bytes()).unwrap();
        let metas = metas();
        let settings = settings();
        let scope = BuildScope {
            cluster: "main",
            config_settings: &settings,
            metas: &metas,
        };
        Graph::build(&cfg.graph[0], &scope)
    }

    #[test]
    fn test_data_dependencies_and_ids() {
        let graph = build(
            r#"
[[graph]]
name = "g"
[[graph.vertex]]
processor = "source"
start = true
[[graph.vertex]]
processor = "middle"
[[graph.vertex]]
graph = "other"
deps = ["middle"]
"#,
        )
        .unwrap();

        let middle = graph.vertex("middle").unwrap();
        assert_eq!(middle.deps().get("source"), Some(&ResultKind::Any));
        assert!(graph.vertex("source").unwrap().successors().contains("middle"));

        let sub = graph.vertex("g_0").expect("generated id");
        assert!(sub.id_generated());
        assert_eq!(sub.cluster, "main", "empty cluster resolves to the owning cluster");

        let source = graph.vertex("source").unwrap();
        assert!(source.input.iter().any(|u| u.field == "REQ" && u.is_extern));
    }

    #[test]
    fn test_aggregate_and_in_out_inputs() {
        let graph = build(
            r#"
[[graph]]
name = "g"
[[graph.vertex]]
id = "m1"
processor = "middle"
input = [{ field = "Mid", extern = true }]
output = [{ field = "ID", id = "ID_1" }]
[[graph.vertex]]
id = "m2"
processor = "middle"
input = [{ field = "Mid", extern = true }]
output = [{ field = "ID", id = "ID_2" }]
[[graph.vertex]]
processor = "sink"
input = [{ field = "IDs", aggregate = ["ID_1", "ID_2"] }]
[[graph.vertex]]
processor = "counter"
deps = ["sink"]
"#,
        )
        .unwrap();

        let sink = graph.vertex("sink").unwrap();
        let deps: Vec<&String> = sink.deps().keys().collect();
        assert_eq!(deps, vec!["m1", "m2"]);

        let counter = graph.vertex("counter").unwrap();
        assert!(
            !counter.deps().contains_key("counter"),
            "in-out port must not depend on itself"
        );
    }

    #[test]
    fn test_edge_kinds_and_successors() {
        let graph = build(
            r#"
[[graph]]
name = "g"
[[graph.vertex]]
id = "a"
processor = "noop"
start = true
if = ["b"]
else = ["c"]
[[graph.vertex]]
id = "b"
processor = "noop"
[[graph.vertex]]
id = "c"
processor = "noop"
[[graph.vertex]]
id = "d"
processor = "noop"
deps_on_ok = ["b"]
deps_on_err = ["c"]
"#,
        )
        .unwrap();

        assert_eq!(graph.vertex("b").unwrap().deps().get("a"), Some(&ResultKind::Ok));
        assert_eq!(graph.vertex("c").unwrap().deps().get("a"), Some(&ResultKind::Err));
        let d = graph.vertex("d").unwrap();
        assert_eq!(d.deps().get("b"), Some(&ResultKind::Ok));
        assert_eq!(d.deps().get("c"), Some(&ResultKind::Err));
        let a_successors: Vec<&String> = graph.vertex("a").unwrap().successors().iter().collect();
        assert_eq!(a_successors, vec!["b", "c"]);
    }

    #[test]
    fn test_build_errors() {
        struct TestCase {
            name: &'static str,
            body: &'static str,
            check: fn(&BuildError) -> bool,
        }

        let test_cases = vec![
            TestCase {
                name: "duplicate vertex",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
[[graph.vertex]]
processor = "noop"
start = true
"#,
                check: |e| matches!(e, BuildError::DuplicateVertex { vertex, .. } if vertex == "noop"),
            },
            TestCase {
                name: "expect and expect_config",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
expect = "true"
expect_config = "flag"
"#,
                check: |e| matches!(e, BuildError::ConflictingExpect { .. }),
            },
            TestCase {
                name: "unknown negated config setting",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
expect_config = "!nope"
"#,
                check: |e| matches!(e, BuildError::UnknownConfigSetting { setting, .. } if setting == "!nope"),
            },
            TestCase {
                name: "missing processor",
                body: r#"
[[graph.vertex]]
processor = "ghost"
start = true
"#,
                check: |e| matches!(e, BuildError::MissingProcessor { vertex, .. } if vertex == "ghost"),
            },
            TestCase {
                name: "empty unit field",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
output = [{ id = "x" }]
"#,
                check: |e| matches!(e, BuildError::EmptyUnitField { .. }),
            },
            TestCase {
                name: "duplicate output",
                body: r#"
[[graph.vertex]]
id = "s1"
processor = "source"
start = true
[[graph.vertex]]
id = "s2"
processor = "source"
start = true
"#,
                check: |e| matches!(e, BuildError::DuplicateOutput { data, first, second, .. }
                    if data == "Mid" && first == "s1" && second == "s2"),
            },
            TestCase {
                name: "unresolved input",
                body: r#"
[[graph.vertex]]
processor = "middle"
start = true
"#,
                check: |e| matches!(e, BuildError::UnresolvedInput { data, .. } if data == "Mid"),
            },
            TestCase {
                name: "unresolved dependency",
                body: r#"
[[graph.vertex]]
processor = "noop"
deps = ["nowhere"]
"#,
                check: |e| matches!(e, BuildError::UnresolvedDependency { dependency, .. } if dependency == "nowhere"),
            },
            TestCase {
                name: "unresolved successor",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
successor = ["nowhere"]
"#,
                check: |e| matches!(e, BuildError::UnresolvedSuccessor { .. }),
            },
            TestCase {
                name: "unknown select_args setting",
                body: r#"
[[graph.vertex]]
processor = "noop"
start = true
select_args = [{ match = "other", args = {} }]
"#,
                check: |e| matches!(e, BuildError::UnknownConfigSetting { setting, .. } if setting == "other"),
            },
            TestCase {
                name: "cycle",
                body: r#"
[[graph.vertex]]
id = "a"
processor = "noop"
deps = ["b"]
[[graph.vertex]]
id = "b"
processor = "noop"
deps = ["a"]
"#,
                check: |e| matches!(e, BuildError::CircleExists { .. }),
            },
            TestCase {
                name: "isolated vertex",
                body: r#"
[[graph.vertex]]
processor = "noop"
"#,
                check: |e| matches!(e, BuildError::Isolated { .. }),
            },
            TestCase {
                name: "start vertex with deps",
                body: r#"
[[graph.vertex]]
id = "a"
processor = "noop"
start = true
[[graph.vertex]]
id = "b"
processor = "noop"
start = true
deps = ["a"]
"#,
                check: |e| matches!(e, BuildError::StartWithDeps { vertex, .. } if vertex == "b"),
            },
        ];

        for case in test_cases {
            let src = format!("[[graph]]\nname = \"g\"\n{}", case.body);
            match build(&src) {
                Ok(_) => panic!("Expected '{}' to fail", case.name),
                Err(err) => assert!((case.check)(&err), "Unexpected error for '{}': {err:?}", case.name),
            }
        }
    }

    #[test]
    fn test_optional_and_cond_vertices_build() {
        let graph = build(
            r#"
[[graph]]
name = "g"
[[graph.vertex]]
processor = "middle"
start = true
input = [{ field = "Mid", optional = true }]
[[graph.vertex]]
cond = "x > 1"
"#,
        );
        assert!(graph.is_ok(), "Unexpected error: {:?}", graph.err());
    }

    #[test]
    fn test_empty_graph() {
        let err = build("[[graph]]\nname = \"g\"\n").unwrap_err();
        assert_eq!(err, BuildError::EmptyGraph { graph: "g".into() });
    }
}
