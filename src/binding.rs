//! Physical-to-logical key bindings.
//!
//! [`KeyMap`] resolves `(DeviceId, PhysicalCode)` pairs to [`LogicalKey`]s and forwards
//! presses and releases to the machine's [`KeyInput`].
//!
//! # Semantics
//! - Unbound codes are ignored.
//! - Held keys are tracked per `(device, code)`: pressing a held code again does nothing,
//!   and releasing forwards the key that was actually pressed, even if the table was
//!   reloaded in between. Releasing a code that is not held does nothing.
//! - Reloads build the new table first and swap it in under the write lock, so a
//!   concurrent press sees either the old table or the new one, never a partial one.

use crate::config::KeyMapping;
use crate::device::DeviceId;
use crate::event::PhysicalCode;
use crate::machine::{KeyInput, LogicalKey};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type BindingTable = HashMap<(DeviceId, PhysicalCode), LogicalKey>;

/// Shared binding table plus held-key state for one machine.
pub struct KeyMap {
    bindings: RwLock<BindingTable>,
    held: Mutex<HashMap<(DeviceId, PhysicalCode), LogicalKey>>,
    input: Arc<dyn KeyInput>,
}

impl KeyMap {
    pub fn new(input: Arc<dyn KeyInput>) -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
            input,
        }
    }

    /// Remove every binding of `device`.
    pub fn clear(&self, device: DeviceId) {
        self.bindings.write().retain(|(dev, _), _| *dev != device);
    }

    /// Insert or overwrite one binding.
    pub fn set_binding(&self, device: DeviceId, code: PhysicalCode, key: LogicalKey) {
        self.bindings.write().insert((device, code), key);
    }

    pub fn lookup(&self, device: DeviceId, code: PhysicalCode) -> Option<LogicalKey> {
        self.bindings.read().get(&(device, code)).copied()
    }

    /// Number of bindings across all devices.
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Press the logical key bound to `code` on `device`, if any.
    pub fn press(&self, device: DeviceId, code: PhysicalCode) {
        let Some(key) = self.lookup(device, code) else {
            log::trace!("{device}: no binding for {code:?}");
            return;
        };

        {
            let mut held = self.held.lock();
            if held.contains_key(&(device, code)) {
                return;
            }
            held.insert((device, code), key);
        }
        self.input.press_key(key, device);
    }

    /// Release whatever logical key `code` on `device` is holding down.
    pub fn release(&self, device: DeviceId, code: PhysicalCode) {
        let key = self.held.lock().remove(&(device, code));
        if let Some(key) = key {
            self.input.release_key(key, device);
        }
    }

    /// Release every held key on every device.
    pub fn release_all(&self) {
        let drained: Vec<_> = self.held.lock().drain().collect();
        for ((device, _), key) in drained {
            self.input.release_key(key, device);
        }
    }

    /// Replace all bindings of `device` with `mappings`.
    pub fn reload_device(&self, device: DeviceId, mappings: &[KeyMapping]) {
        self.reload_all([(device, mappings)]);
    }

    /// Replace the bindings of every listed device in one atomic swap.
    ///
    /// Devices not listed keep their bindings.
    pub fn reload_all<'a>(&self, entries: impl IntoIterator<Item = (DeviceId, &'a [KeyMapping])>) {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut fresh: BindingTable = HashMap::new();
        for (device, mappings) in &entries {
            for mapping in mappings.iter() {
                fresh.insert((*device, mapping.physical), mapping.input.key());
            }
        }

        let mut bindings = self.bindings.write();
        bindings.retain(|(dev, _), _| !entries.iter().any(|(d, _)| d == dev));
        bindings.extend(fresh);
        log::debug!(
            "reloaded bindings for {} device(s), {} total",
            entries.len(),
            bindings.len()
        );
    }
}
