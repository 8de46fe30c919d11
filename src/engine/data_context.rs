//! Shared data store for one run.
//!
//! Values are keyed by `(name, type)` so two ports may share a name as long
//! as they carry different types. Keys are registered empty up front and
//! filled as producers finish; all access is safe from concurrent vertices.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

/// A type-erased value held by the data context.
pub type DataValue = Arc<dyn Any + Send + Sync>;

/// Identifies a datum by name and value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey {
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl DataKey {
    pub fn new(name: impl Into<String>, type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            name: name.into(),
            type_id,
            type_name,
        }
    }

    pub fn of<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self::new(name, TypeId::of::<T>(), type_name::<T>())
    }
}

/// Concurrent map of data values plus the run's config setting results.
#[derive(Debug, Default)]
pub struct DataContext {
    data: DashMap<DataKey, Option<DataValue>>,
    config_settings: DashMap<String, bool>,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty slot for `key` unless one exists.
    pub fn register(&self, key: DataKey) {
        self.data.entry(key).or_insert(None);
    }

    pub fn contains(&self, key: &DataKey) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &DataKey) -> Option<DataValue> {
        self.data.get(key).and_then(|slot| slot.value().clone())
    }

    pub fn set(&self, key: DataKey, value: DataValue) {
        self.data.insert(key, Some(value));
    }

    /// Empties the slot for `key`, returning its value.
    pub fn take(&self, key: &DataKey) -> Option<DataValue> {
        self.data.get_mut(key).and_then(|mut slot| slot.take())
    }

    pub fn set_value<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.set(DataKey::of::<T>(name), Arc::new(value));
    }

    /// Stores an already shared value, so the caller can observe mutations
    /// made through interior mutability.
    pub fn set_shared<T: Any + Send + Sync>(&self, name: impl Into<String>, value: Arc<T>) {
        self.set(DataKey::of::<T>(name), value);
    }

    pub fn get_value<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(&DataKey::of::<T>(name))
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn set_config_setting(&self, name: impl Into<String>, value: bool) {
        self.config_settings.insert(name.into(), value);
    }

    /// The evaluated value of a config setting; unevaluated settings are `false`.
    pub fn config_setting(&self, name: &str) -> bool {
        self.config_settings.get(name).map(|v| *v).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
