//! Processor metadata: the port declarations of each registered processor,
//! in a form that can be dumped to and read back from JSON.
//!
//! The graph builder uses metadata to fill in ports a vertex does not declare
//! explicitly, so graphs can be built and visualised without the processors
//! themselves being linked in.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Port flags. A non-zero value means set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldFlags {
    pub is_extern: i32,
    pub is_aggregate: i32,
    pub is_in_out: i32,
}

impl FieldFlags {
    pub fn is_extern(&self) -> bool {
        self.is_extern > 0
    }

    pub fn is_aggregate(&self) -> bool {
        self.is_aggregate > 0
    }

    pub fn is_in_out(&self) -> bool {
        self.is_in_out > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    #[serde(default)]
    pub flags: FieldFlags,
}

/// Inputs and outputs of one processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMeta {
    pub name: String,
    #[serde(default)]
    pub input: Vec<FieldMeta>,
    #[serde(default)]
    pub output: Vec<FieldMeta>,
}

/// Index metadata by processor name.
pub fn index_metas(metas: &[OperatorMeta]) -> HashMap<String, OperatorMeta> {
    metas
        .iter()
        .map(|meta| (meta.name.clone(), meta.clone()))
        .collect()
}

pub fn parse_metas(content: &str) -> Result<Vec<OperatorMeta>, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        codec: "json",
        message: e.to_string(),
    })
}

pub fn load_meta_file<P: AsRef<Path>>(path: P) -> Result<Vec<OperatorMeta>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_metas(&content)
}

/// Write metadata as pretty-printed JSON.
pub fn dump_meta_file<P: AsRef<Path>>(path: P, metas: &[OperatorMeta]) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(metas).map_err(|e| ConfigError::Encode {
        codec: "json",
        message: e.to_string(),
    })?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
