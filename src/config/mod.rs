// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration: the cluster document model, its codecs, processor
//! metadata, and the processor registry.

mod loader;
mod metadata;
mod params;
mod registry;

pub mod consts;

pub use loader::{
    cluster_name_for_path, codec_for_path, load_cluster_content, load_cluster_file, ClusterConfig,
    Codec, ConfigSetting, GraphConfig, JsonCodec, SelectArgs, TomlCodec, UnitConfig, VertexConfig,
    YamlCodec,
};
pub use metadata::{
    dump_meta_file, index_metas, load_meta_file, parse_metas, FieldFlags, FieldMeta, OperatorMeta,
};
pub use params::Params;
pub use registry::{generate_meta, ProcessorFactory, ProcessorRegistry};
