//! In-memory [`StateStore`] guarded by a read/write lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hubbridge_domain::actuator::Actuator;
use hubbridge_domain::rpc::{DatapointUpdate, RpcResponse};

use crate::ports::StateStore;

/// Actuator state kept in process memory.
///
/// A single writer (inbound frame handling) and many readers (command
/// resolution) share the map through an [`RwLock`].
#[derive(Default)]
pub struct MemoryStore {
    actuators: RwLock<BTreeMap<String, Actuator>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with actuators.
    #[must_use]
    pub fn with_actuators(actuators: impl IntoIterator<Item = Actuator>) -> Self {
        let store = Self::new();
        for actuator in actuators {
            store.seed(actuator);
        }
        store
    }

    /// Insert or replace an actuator, typically a virtual endpoint from
    /// configuration.
    pub fn seed(&self, actuator: Actuator) {
        self.write().insert(actuator.serial.clone(), actuator);
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Actuator>> {
        self.actuators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Actuator>> {
        self.actuators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStore {
    fn actuator(&self, serial: &str) -> Option<Actuator> {
        self.read().get(serial).cloned()
    }

    fn actuators(&self) -> Vec<Actuator> {
        self.read().values().cloned().collect()
    }

    fn apply_update(&self, updates: &[DatapointUpdate]) -> Vec<String> {
        let mut actuators = self.write();
        let mut touched = BTreeSet::new();

        for update in updates {
            let Some(actuator) = actuators.get_mut(&update.serial) else {
                tracing::debug!(serial = %update.serial, "update for unknown actuator ignored");
                continue;
            };
            let changed = match &update.channel {
                Some(channel) => actuator
                    .channel_mut(channel)
                    .set(update.datapoint.as_str(), update.value.clone()),
                None => {
                    actuator
                        .parameters
                        .insert(update.datapoint.clone(), update.value.clone())
                        .as_ref()
                        != Some(&update.value)
                }
            };
            if changed {
                touched.insert(update.serial.clone());
            }
        }

        touched.into_iter().collect()
    }

    fn apply_response(&self, response: &RpcResponse) -> Vec<String> {
        match response {
            RpcResponse::Project(devices) => {
                let mut actuators = self.write();
                for device in devices {
                    let mut device = device.clone();
                    // configured scenes keep pointing at their owner
                    if let Some(existing) = actuators.get(&device.serial) {
                        if existing.is_virtual() {
                            device.serial_number.clone_from(&existing.serial_number);
                        }
                    }
                    actuators.insert(device.serial.clone(), device);
                }
                tracing::info!(devices = devices.len(), "project applied");
                devices.iter().map(|device| device.serial.clone()).collect()
            }
            RpcResponse::Fault { code, message } => {
                tracing::warn!(code, %message, "hub returned an RPC fault");
                Vec::new()
            }
            RpcResponse::Value(_) | RpcResponse::Empty => Vec::new(),
        }
    }
}
