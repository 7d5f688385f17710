//! Live instances that instance-bound command targets run against.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

/// A registered object plus the label used in console output.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    label: String,
}

impl Instance {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    fn is<T: Any + Send + Sync>(&self, value: &Arc<T>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(value))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// The set of live instances, in registration order.
///
/// Mutated at setup and teardown only; lookups during dispatch take a
/// snapshot.
#[derive(Default)]
pub struct TargetInstances {
    items: RwLock<Vec<Instance>>,
}

impl TargetInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value`, labelled with its type name.
    ///
    /// Returns `false` if this exact object is already registered.
    pub fn register<T: Any + Send + Sync>(&self, value: Arc<T>) -> bool {
        let full = std::any::type_name::<T>();
        let label = full.rsplit("::").next().unwrap_or(full).to_string();
        self.register_labeled(value, label)
    }

    pub fn register_labeled<T: Any + Send + Sync>(
        &self,
        value: Arc<T>,
        label: impl Into<String>,
    ) -> bool {
        let mut items = self.items.write();
        if items.iter().any(|i| i.is(&value)) {
            return false;
        }
        let label = label.into();
        debug!(label = %label, "registered command target instance");
        items.push(Instance {
            value,
            type_id: TypeId::of::<T>(),
            label,
        });
        true
    }

    /// Removes this exact object. Returns `false` if it was not registered.
    pub fn deregister<T: Any + Send + Sync>(&self, value: &Arc<T>) -> bool {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|i| !i.is(value));
        before != items.len()
    }

    /// Snapshot of the live instances of one concrete type.
    pub fn of_type(&self, type_id: TypeId) -> Vec<Instance> {
        self.items
            .read()
            .iter()
            .filter(|i| i.type_id == type_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl fmt::Debug for TargetInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.read().iter()).finish()
    }
}
