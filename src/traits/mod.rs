pub mod processor;

pub use processor::{PortKind, PortSpec, Processor};
