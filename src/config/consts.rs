/// Contexts pre-built per cluster when the document leaves the pool size at 0
pub const DEFAULT_CONTEXT_POOL_SIZE: usize = 10;
/// Capacity of the timing event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;
/// Prefix of the per-dependency result codes bound for `expect` expressions
pub const RET_CODE_PREFIX: &str = "RET_CODE_";
/// Key under which run parameters are merged into a vertex's parameters
pub const GLOBAL_PARAMS_KEY: &str = "GLOBAL";
/// Cluster name used for documents loaded from memory
pub const DEFAULT_CLUSTER_NAME: &str = "DefaultCluster";
