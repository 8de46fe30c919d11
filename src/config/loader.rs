// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cluster document model and the codecs that decode it.
//!
//! A cluster document is a flat description of config settings and graphs.
//! The same model is accepted from TOML, JSON, or YAML; the codec is picked
//! from the file extension when loading from disk.

use crate::config::params::Params;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level cluster configuration.
///
/// # Fields
/// * `desc` - Free-form description
/// * `strict_dsl` - Parsed and exposed on the built cluster; no checks depend on it
/// * `default_context_pool_size` - Contexts pre-built per cluster; `0` means the default
/// * `config_setting` - Named boolean predicates evaluated once per run
/// * `graph` - Graph definitions
///
/// # Example
/// ```toml
/// [[config_setting]]
/// name = "with_ads"
/// cond = "user_type == \"free\""
///
/// [[graph]]
/// name = "main"
///
/// [[graph.vertex]]
/// processor = "fetch"
/// start = true
///
/// [[graph.vertex]]
/// processor = "render"
/// deps = ["fetch"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub desc: String,
    pub strict_dsl: bool,
    pub default_context_pool_size: usize,
    pub config_setting: Vec<ConfigSetting>,
    pub graph: Vec<GraphConfig>,
}

/// A named boolean predicate over the run parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigSetting {
    pub name: String,
    pub cond: String,
    pub processor: String,
}

/// One named graph.
///
/// Graphs sharing a name are told apart by `expect_version`; the one with the
/// higher `priority` is kept.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphConfig {
    pub name: String,
    pub vertex: Vec<VertexConfig>,
    pub expect_version: String,
    pub priority: i64,
}

/// One vertex of a graph, bound to either a processor or a subgraph.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VertexConfig {
    pub id: String,
    pub processor: String,
    pub cond: String,
    pub expect: String,
    pub expect_config: String,
    pub select_args: Vec<SelectArgs>,
    pub args: Params,
    pub cluster: String,
    pub graph: String,
    pub successor: Vec<String>,
    #[serde(rename = "if")]
    pub successor_on_ok: Vec<String>,
    #[serde(rename = "else")]
    pub successor_on_err: Vec<String>,
    pub deps: Vec<String>,
    pub deps_on_ok: Vec<String>,
    pub deps_on_err: Vec<String>,
    pub input: Vec<UnitConfig>,
    pub output: Vec<UnitConfig>,
    pub start: bool,
}

/// Parameter override applied when the named config setting holds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectArgs {
    #[serde(rename = "match")]
    pub match_setting: String,
    pub args: Params,
}

/// Declared binding between a processor port and a named datum.
///
/// `id` names the datum in the graph and defaults to `field`. `aggregate`
/// lists the data ids a multi-input port collects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UnitConfig {
    pub id: String,
    pub field: String,
    pub aggregate: Vec<String>,
    pub cond: String,
    pub required: bool,
    pub optional: bool,
    #[serde(rename = "move")]
    pub move_value: bool,
    #[serde(rename = "extern")]
    pub is_extern: bool,
}

/// Decodes a cluster document from raw bytes.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, content: &[u8]) -> Result<ClusterConfig, ConfigError>;
}

pub struct TomlCodec;
pub struct JsonCodec;
pub struct YamlCodec;

fn utf8<'a>(codec: &'static str, content: &'a [u8]) -> Result<&'a str, ConfigError> {
    std::str::from_utf8(content).map_err(|e| ConfigError::Parse {
        codec,
        message: e.to_string(),
    })
}

impl Codec for TomlCodec {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn decode(&self, content: &[u8]) -> Result<ClusterConfig, ConfigError> {
        toml::from_str(utf8(self.name(), content)?).map_err(|e| ConfigError::Parse {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, content: &[u8]) -> Result<ClusterConfig, ConfigError> {
        serde_json::from_slice(content).map_err(|e| ConfigError::Parse {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn decode(&self, content: &[u8]) -> Result<ClusterConfig, ConfigError> {
        serde_yaml::from_slice(content).map_err(|e| ConfigError::Parse {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}

/// Picks a codec from the path's extension. Anything unrecognised is read as JSON.
pub fn codec_for_path(path: &Path) -> Box<dyn Codec> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Box::new(TomlCodec),
        Some("yaml") | Some("yml") => Box::new(YamlCodec),
        _ => Box::new(JsonCodec),
    }
}

/// The cluster name for a file: its base name, extension included.
pub fn cluster_name_for_path(path: &Path) -> String {
    path.file_name()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Decode a cluster document with an explicit codec.
pub fn load_cluster_content(content: &[u8], codec: &dyn Codec) -> Result<ClusterConfig, ConfigError> {
    codec.decode(content)
}

/// Read and decode a cluster file, returning its cluster name and configuration.
pub fn load_cluster_file<P: AsRef<Path>>(path: P) -> Result<(String, ClusterConfig), ConfigError> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let codec = codec_for_path(path);
    let config = load_cluster_content(&content, codec.as_ref())?;
    Ok((cluster_name_for_path(path), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML_CLUSTER: &str = r#"
desc = "sample"
default_context_pool_size = 4

[[config_setting]]
name = "with_ads"
cond = "user_type == \"free\""

[[graph]]
name = "main"
priority = 2

[[graph.vertex]]
id = "fetch"
processor = "fetch"
start = true
args = { limit = 10 }
if = ["render"]

[[graph.vertex]]
processor = "render"
expect_config = "!with_ads"

[[graph.vertex.input]]
field = "Items"
id = "fetched_items"
extern = true

[[graph.vertex.select_args]]
match = "with_ads"
args = { mode = "ads" }
"#;

    #[test]
    fn test_decode_toml_cluster() {
        let cfg = TomlCodec.decode(TOML_CLUSTER.as_bytes()).unwrap();

        assert_eq!(cfg.desc, "sample");
        assert_eq!(cfg.default_context_pool_size, 4);
        assert!(!cfg.strict_dsl);
        assert_eq!(cfg.config_setting.len(), 1);
        assert_eq!(cfg.config_setting[0].name, "with_ads");

        let graph = &cfg.graph[0];
        assert_eq!(graph.name, "main");
        assert_eq!(graph.priority, 2);
        assert_eq!(graph.expect_version, "");
        assert_eq!(graph.vertex.len(), 2);

        let fetch = &graph.vertex[0];
        assert!(fetch.start);
        assert_eq!(fetch.args.get_i64("limit"), 10);
        assert_eq!(fetch.successor_on_ok, vec!["render"]);

        let render = &graph.vertex[1];
        assert_eq!(render.id, "", "ids are filled in by the builder");
        assert_eq!(render.expect_config, "!with_ads");
        assert_eq!(render.input[0].field, "Items");
        assert_eq!(render.input[0].id, "fetched_items");
        assert!(render.input[0].is_extern);
        assert_eq!(render.select_args[0].match_setting, "with_ads");
        assert_eq!(render.select_args[0].args.get_str("mode"), "ads");
    }

    #[test]
    fn test_decode_json_and_yaml_agree() {
        let json = r#"{
            "graph": [{
                "name": "g",
                "vertex": [{"processor": "a", "start": true, "else": ["b"]}, {"processor": "b"}]
            }]
        }"#;
        let yaml = r#"
graph:
  - name: g
    vertex:
      - processor: a
        start: true
        else: [b]
      - processor: b
"#;
        let from_json = JsonCodec.decode(json.as_bytes()).unwrap();
        let from_yaml = YamlCodec.decode(yaml.as_bytes()).unwrap();

        for cfg in [&from_json, &from_yaml] {
            assert_eq!(cfg.graph[0].name, "g");
            assert_eq!(cfg.graph[0].vertex[0].successor_on_err, vec!["b"]);
            assert_eq!(cfg.graph[0].vertex[1].processor, "b");
        }
    }

    #[test]
    fn test_decode_reports_codec_on_failure() {
        let err = TomlCodec.decode(b"[[graph]\nname=").unwrap_err();
        assert!(
            matches!(err, ConfigError::Parse { codec: "toml", .. }),
            "Expected a toml parse error, got {err:?}"
        );
    }

    #[test]
    fn test_codec_selection_by_extension() {
        struct TestCase {
            path: &'static str,
            expected: &'static str,
        }

        let test_cases = vec![
            TestCase { path: "a/b/cluster.toml", expected: "toml" },
            TestCase { path: "cluster.yaml", expected: "yaml" },
            TestCase { path: "cluster.yml", expected: "yaml" },
            TestCase { path: "cluster.json", expected: "json" },
            TestCase { path: "cluster", expected: "json" },
        ];

        for case in test_cases {
            let codec = codec_for_path(Path::new(case.path));
            assert_eq!(codec.name(), case.expected, "Unexpected codec for '{}'", case.path);
        }
    }

    #[test]
    fn test_load_cluster_file_names_cluster_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(TOML_CLUSTER.as_bytes()).unwrap();

        let (name, cfg) = load_cluster_file(&path).unwrap();
        assert_eq!(name, "search.toml");
        assert_eq!(cfg.graph.len(), 1);
    }

    #[test]
    fn test_load_cluster_file_missing() {
        let err = load_cluster_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
