use thiserror::Error;

/// Errors raised while building a cluster from its configuration, or while
/// binding a built graph to registered processors.
///
/// Every variant carries enough identifiers to locate the offending entry in
/// the source document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The cluster declares no graphs at all.
    #[error("cluster '{cluster}' declares no graphs")]
    EmptyCluster { cluster: String },

    /// A graph declares no vertices.
    #[error("graph '{graph}' declares no vertices")]
    EmptyGraph { graph: String },

    /// Two graphs share a name and expect_version.
    #[error("duplicate graph '{graph}' with expect_version '{expect_version}'")]
    DuplicateGraph { graph: String, expect_version: String },

    /// Two vertices in one graph share an id.
    #[error("duplicate vertex '{vertex}' in graph '{graph}'")]
    DuplicateVertex { graph: String, vertex: String },

    /// A vertex sets both `expect` and `expect_config`.
    #[error("vertex '{vertex}' in graph '{graph}' sets both expect and expect_config")]
    ConflictingExpect { graph: String, vertex: String },

    /// A reference to a config setting the cluster does not declare.
    #[error("vertex '{vertex}' in graph '{graph}' references unknown config setting '{setting}'")]
    UnknownConfigSetting {
        graph: String,
        vertex: String,
        setting: String,
    },

    /// A vertex names no processor metadata, no subgraph, and no condition.
    #[error("no processor found for vertex '{vertex}' in graph '{graph}'")]
    MissingProcessor { graph: String, vertex: String },

    /// A declared input or output unit has an empty field.
    #[error("vertex '{vertex}' in graph '{graph}' declares a unit with an empty field")]
    EmptyUnitField { graph: String, vertex: String },

    /// Two vertices produce the same data id.
    #[error("data '{data}' in graph '{graph}' is produced by both '{first}' and '{second}'")]
    DuplicateOutput {
        graph: String,
        data: String,
        first: String,
        second: String,
    },

    /// An input has no producer and is neither extern nor optional.
    #[error("input '{data}' of vertex '{vertex}' in graph '{graph}' has no producer")]
    UnresolvedInput {
        graph: String,
        vertex: String,
        data: String,
    },

    /// A dependency list names a vertex that does not exist.
    #[error("vertex '{vertex}' in graph '{graph}' depends on missing vertex '{dependency}'")]
    UnresolvedDependency {
        graph: String,
        vertex: String,
        dependency: String,
    },

    /// A successor list names a vertex that does not exist.
    #[error("vertex '{vertex}' in graph '{graph}' names missing successor '{successor}'")]
    UnresolvedSuccessor {
        graph: String,
        vertex: String,
        successor: String,
    },

    /// The dependency relation contains a cycle.
    #[error("circle exists in graph '{graph}': {}", .cycle.join(" -> "))]
    CircleExists { graph: String, cycle: Vec<String> },

    /// A non-start vertex has neither dependencies nor successors.
    #[error("vertex '{vertex}' in graph '{graph}' is isolated")]
    Isolated { graph: String, vertex: String },

    /// A start vertex declares dependencies.
    #[error("start vertex '{vertex}' in graph '{graph}' has dependencies")]
    StartWithDeps { graph: String, vertex: String },

    /// A declared unit field is not a port of the bound processor.
    #[error("processor '{processor}' has no port named '{field}'")]
    UnknownPortField { processor: String, field: String },

    /// A vertex names a processor the registry cannot create.
    #[error("processor '{processor}' is not registered")]
    UnregisteredProcessor { processor: String },
}
