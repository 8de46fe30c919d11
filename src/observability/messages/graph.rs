// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for cluster and graph construction.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A dependency cycle was found while building a graph.
///
/// # Log Level
/// `error!` - the cluster is rejected
pub struct CircleDetected<'a> {
    pub graph: &'a str,
    pub cycle: &'a [String],
}

impl Display for CircleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Circle exists in graph '{}': {}",
            self.graph,
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CircleDetected<'_> {
    fn log(&self) {
        tracing::error!(
            graph = self.graph,
            cycle = ?self.cycle,
            "{}", self
        );
    }
}

/// A graph definition lost to another of the same name with higher priority.
///
/// # Log Level
/// `info!`
pub struct GraphShadowed<'a> {
    pub graph: &'a str,
    pub expect_version: &'a str,
    pub winner: &'a str,
}

impl Display for GraphShadowed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Graph '{}' version '{}' shadowed by version '{}'",
            self.graph, self.expect_version, self.winner
        )
    }
}

impl StructuredLog for GraphShadowed<'_> {
    fn log(&self) {
        tracing::info!(
            graph = self.graph,
            expect_version = self.expect_version,
            winner = self.winner,
            "{}", self
        );
    }
}
