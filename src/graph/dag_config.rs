use std::fs;
use std::path::{Path, PathBuf};

use crate::config::consts::DEFAULT_CLUSTER_NAME;
use crate::config::{
    load_cluster_content, load_cluster_file, load_meta_file, parse_metas,
    Codec, OperatorMeta, TomlCodec,
};
use crate::errors::ConfigError;
use crate::graph::cluster::Cluster;

/// A cluster built from metadata alone, for inspection and rendering.
///
/// No processors are needed: ports come from an operator metadata document,
/// typically produced by [`ProcessorRegistry::dump_meta_file`](crate::config::ProcessorRegistry::dump_meta_file).
#[derive(Debug)]
pub struct DagConfig {
    metas: Vec<OperatorMeta>,
    cluster: Cluster,
    script_path: Option<PathBuf>,
}

impl DagConfig {
    /// Loads metadata JSON and a cluster file. The cluster is named after the file.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(meta_path: P, script_path: Q) -> Result<Self, ConfigError> {
        let metas = load_meta_file(meta_path)?;
        let script_path = script_path.as_ref();
        let (name, config) = load_cluster_file(script_path)?;
        let cluster = Cluster::build(&name, config, &metas)?;
        Ok(Self {
            metas,
            cluster,
            script_path: Some(script_path.to_path_buf()),
        })
    }

    /// Builds from in-memory metadata JSON (may be blank) and a TOML cluster document.
    pub fn from_content(meta: &str, script: &str) -> Result<Self, ConfigError> {
        let meta = meta.trim();
        let metas = if meta.is_empty() {
            Vec::new()
        } else {
            parse_metas(meta)?
        };
        let config = load_cluster_content(script.as_bytes(), &TomlCodec as &dyn Codec)?;
        let cluster = Cluster::build(DEFAULT_CLUSTER_NAME, config, &metas)?;
        Ok(Self {
            metas,
            cluster,
            script_path: None,
        })
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn metas(&self) -> &[OperatorMeta] {
        &self.metas
    }

    pub fn dump_dot(&self) -> String {
        self.cluster.dump_dot()
    }

    /// Writes `<path>.dot`, defaulting `path` to the script the cluster was
    /// loaded from, and returns the written file.
    pub fn write_dot(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let base = match (path, &self.script_path) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(script)) => script.clone(),
            (None, None) => PathBuf::from(&self.cluster.name),
        };
        let mut target = base.into_os_string();
        target.push(".dot");
        let target = PathBuf::from(target);
        fs::write(&target, self.dump_dot()).map_err(|source| ConfigError::Io {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}
