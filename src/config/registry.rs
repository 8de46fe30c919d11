use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::metadata::{dump_meta_file, FieldFlags, FieldMeta, OperatorMeta};
use crate::errors::ConfigError;
use crate::traits::{PortKind, Processor};

/// Creates a fresh processor instance for one vertex context.
pub type ProcessorFactory = Arc<dyn Fn() -> Box<dyn Processor> + Send + Sync>;

/// Maps processor names to factories.
///
/// The registry is populated at startup and handed to the
/// [`ClusterManager`](crate::engine::ClusterManager), which shares it
/// read-only with every context it builds. Each pooled graph context gets
/// its own processor instances from these factories.
///
/// # Examples
/// ```text
/// let mut registry = ProcessorRegistry::new();
/// registry
///     .register("fetch", || Box::new(Fetch::default()))
///     .register("render", || Box::new(Render::default()));
///
/// assert!(registry.contains("fetch"));
/// ```
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Processor> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Processor>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Metadata for every registered processor, sorted by name.
    pub fn generate_metas(&self) -> Vec<OperatorMeta> {
        self.names()
            .into_iter()
            .filter_map(|name| self.create(name).map(|p| generate_meta(name, p.as_ref())))
            .collect()
    }

    pub fn dump_meta_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        dump_meta_file(path, &self.generate_metas())
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.names())
            .finish()
    }
}

/// Derives the metadata of one processor from its port declarations.
pub fn generate_meta(name: &str, processor: &dyn Processor) -> OperatorMeta {
    let mut meta = OperatorMeta {
        name: name.to_string(),
        ..Default::default()
    };
    for port in processor.ports() {
        if port.kind.is_input() {
            let flags = FieldFlags {
                is_extern: i32::from(port.kind == PortKind::Extern),
                is_aggregate: i32::from(port.kind == PortKind::Aggregate),
                is_in_out: i32::from(port.kind == PortKind::InOut),
            };
            meta.input.push(FieldMeta {
                name: port.field.to_string(),
                flags,
            });
        }
        if port.kind.is_output() {
            meta.output.push(FieldMeta {
                name: port.field.to_string(),
                flags: FieldFlags::default(),
            });
        }
    }
    meta
}
