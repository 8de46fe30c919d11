// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

use super::BuildError;

/// Errors raised while loading configuration documents from disk or memory.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be decoded by the selected codec.
    #[error("failed to decode {codec} document: {message}")]
    Parse { codec: &'static str, message: String },

    /// The decoded document could not be serialized back out.
    #[error("failed to encode {codec} document: {message}")]
    Encode { codec: &'static str, message: String },

    /// The decoded cluster failed to build.
    #[error(transparent)]
    Build(#[from] BuildError),
}
