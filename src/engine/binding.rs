//! Port binding between a vertex's processor and the run's data context.
//!
//! A [`PortBinder`] is resolved once per vertex context from the processor's
//! [`PortSpec`]s and the vertex's units. Each execution it fills a
//! [`PortIo`] from the data context, hands it to the processor, then copies
//! the written outputs back.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::data_context::{DataContext, DataKey, DataValue};
use crate::errors::{BuildError, PortError};
use crate::graph::Unit;
use crate::traits::{PortKind, PortSpec};

#[derive(Debug, Clone)]
struct BoundPort {
    field: &'static str,
    key: DataKey,
    move_value: bool,
}

#[derive(Debug, Clone)]
struct AggregatePort {
    field: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    sources: Vec<DataKey>,
}

/// Resolved mapping from processor ports to data keys.
#[derive(Debug, Clone, Default)]
pub struct PortBinder {
    inputs: Vec<BoundPort>,
    externs: Vec<BoundPort>,
    aggregates: Vec<AggregatePort>,
    outputs: Vec<BoundPort>,
}

impl PortBinder {
    /// Resolves `ports` against the vertex's declared units.
    ///
    /// A unit whose field names no port of the right direction is an error,
    /// unless it is an aggregate unit.
    pub fn prepare(
        processor: &str,
        ports: &[PortSpec],
        inputs: &[Unit],
        outputs: &[Unit],
    ) -> Result<Self, BuildError> {
        for unit in inputs {
            check_declared(processor, ports, unit, PortKind::is_input)?;
        }
        for unit in outputs {
            check_declared(processor, ports, unit, PortKind::is_output)?;
        }

        let mut binder = PortBinder::default();
        for port in ports {
            let input_unit = inputs.iter().find(|u| u.field == port.field);
            let output_unit = outputs.iter().find(|u| u.field == port.field);
            match port.kind {
                PortKind::Input | PortKind::InOut => {
                    binder.inputs.push(bind(port, input_unit));
                    if port.kind == PortKind::InOut {
                        binder.outputs.push(bind(port, output_unit));
                    }
                }
                PortKind::Extern => binder.externs.push(bind(port, input_unit)),
                PortKind::Aggregate => binder.aggregates.push(AggregatePort {
                    field: port.field,
                    type_id: port.type_id,
                    type_name: port.type_name,
                    sources: input_unit
                        .map(|u| {
                            u.aggregate
                                .iter()
                                .map(|source| DataKey::new(source.clone(), port.type_id, port.type_name))
                                .collect()
                        })
                        .unwrap_or_default(),
                }),
                PortKind::Output => binder.outputs.push(bind(port, output_unit)),
            }
        }
        Ok(binder)
    }

    /// Keys of plain inputs, registered up front in the data context.
    pub fn input_keys(&self) -> impl Iterator<Item = &DataKey> {
        self.inputs.iter().map(|p| &p.key)
    }

    pub fn output_keys(&self) -> impl Iterator<Item = &DataKey> {
        self.outputs.iter().map(|p| &p.key)
    }

    /// Builds the port view for one execution.
    ///
    /// Extern inputs missing from `data` fall back to `defaults`.
    pub fn inject(&self, data: &DataContext, defaults: &DataContext) -> PortIo {
        let mut io = PortIo::default();
        for port in &self.inputs {
            let value = if port.move_value {
                data.take(&port.key)
            } else {
                data.get(&port.key)
            };
            io.inputs.insert(port.field, Slot::new(&port.key, value));
        }
        for port in &self.externs {
            let value = data.get(&port.key).or_else(|| defaults.get(&port.key));
            io.inputs.insert(port.field, Slot::new(&port.key, value));
        }
        for port in &self.aggregates {
            let values = port
                .sources
                .iter()
                .filter_map(|key| data.get(key).map(|value| (key.name.clone(), value)))
                .collect();
            io.aggregates.insert(
                port.field,
                AggregateSlot {
                    type_id: port.type_id,
                    type_name: port.type_name,
                    values,
                },
            );
        }
        for port in &self.outputs {
            io.outputs.insert(port.field, Slot::new(&port.key, None));
        }
        io
    }

    /// Publishes every output the processor wrote.
    pub fn harvest(&self, mut io: PortIo, data: &DataContext) {
        for port in &self.outputs {
            if let Some(value) = io.outputs.remove(port.field).and_then(|slot| slot.value) {
                data.set(port.key.clone(), value);
            }
        }
    }
}

fn bind(port: &PortSpec, unit: Option<&Unit>) -> BoundPort {
    let name = match unit {
        Some(unit) if !unit.id.is_empty() && port.kind != PortKind::Extern => unit.id.clone(),
        _ => port.field.to_string(),
    };
    BoundPort {
        field: port.field,
        key: DataKey::new(name, port.type_id, port.type_name),
        move_value: unit.map(|u| u.move_value).unwrap_or(false),
    }
}

fn check_declared(
    processor: &str,
    ports: &[PortSpec],
    unit: &Unit,
    direction: fn(PortKind) -> bool,
) -> Result<(), BuildError> {
    if !unit.aggregate.is_empty() || ports.iter().any(|p| p.field == unit.field && direction(p.kind)) {
        return Ok(());
    }
    Err(BuildError::UnknownPortField {
        processor: processor.to_string(),
        field: unit.field.clone(),
    })
}

#[derive(Debug)]
struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    value: Option<DataValue>,
}

impl Slot {
    fn new(key: &DataKey, value: Option<DataValue>) -> Self {
        Self {
            type_id: key.type_id,
            type_name: key.type_name,
            value,
        }
    }

    fn check<T: Any>(&self, field: &str) -> Result<(), PortError> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(PortError::TypeMismatch {
                field: field.to_string(),
                declared: self.type_name,
                requested: type_name::<T>(),
            })
        }
    }
}

#[derive(Debug)]
struct AggregateSlot {
    type_id: TypeId,
    type_name: &'static str,
    values: HashMap<String, DataValue>,
}

/// A processor's view of its ports during one execution.
#[derive(Debug, Default)]
pub struct PortIo {
    inputs: HashMap<&'static str, Slot>,
    aggregates: HashMap<&'static str, AggregateSlot>,
    outputs: HashMap<&'static str, Slot>,
}

impl PortIo {
    /// Reads an input or extern port. `Ok(None)` means no value was produced.
    pub fn input<T: Any + Send + Sync>(&self, field: &str) -> Result<Option<Arc<T>>, PortError> {
        let slot = self.inputs.get(field).ok_or_else(|| PortError::UnknownField {
            field: field.to_string(),
        })?;
        slot.check::<T>(field)?;
        Ok(slot.value.clone().and_then(|value| value.downcast::<T>().ok()))
    }

    /// Reads an aggregate port as a map from producing data id to value.
    pub fn aggregate<T: Any + Send + Sync>(&self, field: &str) -> Result<HashMap<String, Arc<T>>, PortError> {
        let slot = self.aggregates.get(field).ok_or_else(|| PortError::UnknownField {
            field: field.to_string(),
        })?;
        if slot.type_id != TypeId::of::<T>() {
            return Err(PortError::TypeMismatch {
                field: field.to_string(),
                declared: slot.type_name,
                requested: type_name::<T>(),
            });
        }
        Ok(slot
            .values
            .iter()
            .filter_map(|(name, value)| {
                value
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|value| (name.clone(), value))
            })
            .collect())
    }

    pub fn set_output<T: Any + Send + Sync>(&mut self, field: &str, value: T) -> Result<(), PortError> {
        let slot = self.outputs.get_mut(field).ok_or_else(|| PortError::UnknownField {
            field: field.to_string(),
        })?;
        slot.check::<T>(field)?;
        slot.value = Some(Arc::new(value));
        Ok(())
    }

    /// Reads back a value written to an output port in this execution.
    pub fn output<T: Any + Send + Sync>(&self, field: &str) -> Option<Arc<T>> {
        self.outputs
            .get(field)
            .and_then(|slot| slot.value.clone())
            .and_then(|value| value.downcast::<T>().ok())
    }
}
