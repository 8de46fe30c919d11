// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // documents, params, processor registry
pub mod engine;     // pooled contexts and the run scheduler
pub mod errors;     // error handling
pub mod graph;      // validated clusters, graphs and vertices
pub mod observability;
pub mod traits;     // the processor contract
