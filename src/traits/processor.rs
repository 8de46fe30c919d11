use std::any::{type_name, Any, TypeId};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Params;
use crate::engine::PortIo;
use crate::errors::ProcessorError;

/// How a port exchanges data with the graph's data context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Reads the datum produced by another vertex.
    Input,
    /// Collects several producers' data of one type, keyed by data id.
    Aggregate,
    /// Reads a datum supplied by the caller rather than by a vertex.
    Extern,
    /// Reads and writes the same datum.
    InOut,
    /// Writes a datum for downstream vertices.
    Output,
}

impl PortKind {
    pub fn is_input(self) -> bool {
        !matches!(self, PortKind::Output)
    }

    pub fn is_output(self) -> bool {
        matches!(self, PortKind::Output | PortKind::InOut)
    }
}

/// Declaration of one port: its field name, kind and value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub field: &'static str,
    pub kind: PortKind,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl PortSpec {
    pub fn new<T: Any + Send + Sync>(field: &'static str, kind: PortKind) -> Self {
        Self {
            field,
            kind,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn input<T: Any + Send + Sync>(field: &'static str) -> Self {
        Self::new::<T>(field, PortKind::Input)
    }

    /// Multi-input port; `T` is the type of each collected value.
    pub fn aggregate<T: Any + Send + Sync>(field: &'static str) -> Self {
        Self::new::<T>(field, PortKind::Aggregate)
    }

    pub fn extern_input<T: Any + Send + Sync>(field: &'static str) -> Self {
        Self::new::<T>(field, PortKind::Extern)
    }

    pub fn in_out<T: Any + Send + Sync>(field: &'static str) -> Self {
        Self::new::<T>(field, PortKind::InOut)
    }

    pub fn output<T: Any + Send + Sync>(field: &'static str) -> Self {
        Self::new::<T>(field, PortKind::Output)
    }
}

/// A task body bound to a vertex.
///
/// Each pooled graph context owns its own processor instance, so
/// `on_execute` may keep state between runs in `&mut self`. Ports are
/// declared once through [`Processor::ports`]; the engine fills the declared
/// inputs before `on_execute` and publishes the declared outputs after it,
/// whether or not it succeeded.
///
/// # Example
/// ```text
/// struct Double;
///
/// #[async_trait]
/// impl Processor for Double {
///     fn ports(&self) -> Vec<PortSpec> {
///         vec![PortSpec::input::<i64>("Value"), PortSpec::output::<i64>("Doubled")]
///     }
///
///     async fn on_execute(&mut self, _: &CancellationToken, _: &Params, io: &mut PortIo)
///         -> Result<(), ProcessorError>
///     {
///         let value = io.input::<i64>("Value")?.map(|v| *v).unwrap_or_default();
///         io.set_output("Doubled", value * 2)?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Processor: Send + Sync {
    fn ports(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    /// Called once when the owning graph context is created.
    fn on_init(&mut self) {}

    async fn on_execute(
        &mut self,
        cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError>;
}
