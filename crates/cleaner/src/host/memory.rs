use super::{DeviceEntry, DeviceRegistry, EntityEntry, RestoreStore, StateStore, StateUpdate};
use crate::HostError;
use async_trait::async_trait;
use hass_energy_proto::{EntityId, EntityState};
use std::{
	cell::{Cell, RefCell},
	collections::BTreeMap,
};

/// A host that keeps registry and states in memory.
///
/// Written states also become the restore states, as if the host had been
/// restarted right after every write.
#[derive(Debug, Default)]
pub struct MemoryHost {
	devices: RefCell<Vec<DeviceEntry>>,
	entities: RefCell<Vec<EntityEntry>>,
	states: RefCell<BTreeMap<EntityId, EntityState>>,
	restore: RefCell<BTreeMap<EntityId, EntityState>>,
	written: RefCell<Vec<StateUpdate>>,
	fail_writes: Cell<bool>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_device(&self, device: DeviceEntry) {
		self.devices.borrow_mut().push(device);
	}

	pub fn remove_device(&self, device_id: &str) {
		self.devices.borrow_mut().retain(|device| &*device.id != device_id);
		self
			.entities
			.borrow_mut()
			.retain(|entity| entity.device_id.as_deref() != Some(device_id));
	}

	pub fn add_entity(&self, entity: EntityEntry) {
		self.entities.borrow_mut().push(entity);
	}

	pub fn set_state(&self, entity_id: EntityId, state: EntityState) {
		self.states.borrow_mut().insert(entity_id, state);
	}

	/// Seed the state an entity had before the integration started.
	pub fn set_restore_state(&self, entity_id: EntityId, state: EntityState) {
		self.restore.borrow_mut().insert(entity_id, state);
	}

	pub fn fail_writes(&self, fail: bool) {
		self.fail_writes.set(fail);
	}

	/// Every update written so far, oldest first.
	pub fn written(&self) -> Vec<StateUpdate> {
		self.written.borrow().clone()
	}

	pub fn take_written(&self) -> Vec<StateUpdate> {
		self.written.take()
	}
}

impl DeviceRegistry for MemoryHost {
	fn devices(&self) -> Vec<DeviceEntry> {
		self.devices.borrow().clone()
	}

	fn entities_for_device(&self, device_id: &str) -> Vec<EntityEntry> {
		self
			.entities
			.borrow()
			.iter()
			.filter(|entity| entity.device_id.as_deref() == Some(device_id))
			.cloned()
			.collect()
	}
}

impl StateStore for MemoryHost {
	fn state(&self, entity_id: &EntityId) -> Option<EntityState> {
		self.states.borrow().get(entity_id).cloned()
	}

	fn write_state(&self, update: StateUpdate) -> Result<(), HostError> {
		if self.fail_writes.get() {
			return Err(HostError::msg("write_state", "state store is read only"));
		}

		self.written.borrow_mut().push(update.clone());
		let (entity_id, state) = update.into_state();
		self.restore.borrow_mut().insert(entity_id.clone(), state.clone());
		self.states.borrow_mut().insert(entity_id, state);
		Ok(())
	}
}

#[async_trait(?Send)]
impl RestoreStore for MemoryHost {
	async fn last_state(&self, entity_id: &EntityId) -> Result<Option<EntityState>, HostError> {
		Ok(self.restore.borrow().get(entity_id).cloned())
	}
}
