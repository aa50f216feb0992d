//! The parts of the host platform the integration talks to.
//!
//! A host is anything that implements [DeviceRegistry], [StateStore] and
//! [RestoreStore]; the blanket [Host] impl ties them together. [MemoryHost]
//! keeps everything in memory and is used by the tests and the replay demo.

mod memory;

use crate::HostError;
use async_trait::async_trait;
use hass_energy_proto::{Attributes, EntityId, EntityState};
use std::sync::Arc;

pub use memory::MemoryHost;

/// A device as listed in the host's device registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
	pub id: Arc<str>,
	pub name: Option<String>,
	pub name_by_user: Option<String>,
	pub manufacturer: Option<String>,
	pub model: Option<String>,
}

impl DeviceEntry {
	pub fn new(id: impl Into<Arc<str>>) -> Self {
		Self {
			id: id.into(),
			name: None,
			name_by_user: None,
			manufacturer: None,
			model: None,
		}
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn name_by_user(mut self, name: impl Into<String>) -> Self {
		self.name_by_user = Some(name.into());
		self
	}

	pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
		self.manufacturer = Some(manufacturer.into());
		self
	}

	pub fn model(mut self, model: impl Into<String>) -> Self {
		self.model = Some(model.into());
		self
	}

	/// The registry name, or the one the user picked when the device has none.
	pub fn display_name(&self) -> Option<&str> {
		[self.name.as_deref(), self.name_by_user.as_deref()]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|name| !name.is_empty())
	}
}

/// An entity as listed in the host's entity registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEntry {
	pub entity_id: EntityId,
	pub device_id: Option<Arc<str>>,
	pub disabled: bool,
}

impl EntityEntry {
	pub fn new(entity_id: EntityId, device_id: impl Into<Arc<str>>) -> Self {
		Self {
			entity_id,
			device_id: Some(device_id.into()),
			disabled: false,
		}
	}

	pub fn disabled(mut self) -> Self {
		self.disabled = true;
		self
	}
}

/// A state written by the integration for one of its entities.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
	pub entity_id: EntityId,
	pub state: String,
	pub attributes: Attributes,
}

impl StateUpdate {
	pub fn into_state(self) -> (EntityId, EntityState) {
		let state = EntityState::new(self.state).with_attributes(self.attributes);
		(self.entity_id, state)
	}
}

pub trait DeviceRegistry {
	fn devices(&self) -> Vec<DeviceEntry>;

	fn entities_for_device(&self, device_id: &str) -> Vec<EntityEntry>;
}

pub trait StateStore {
	/// Current state of an entity, if it has one.
	fn state(&self, entity_id: &EntityId) -> Option<EntityState>;

	fn write_state(&self, update: StateUpdate) -> Result<(), HostError>;
}

#[async_trait(?Send)]
pub trait RestoreStore {
	/// The state an entity had when the host last shut down.
	async fn last_state(&self, entity_id: &EntityId) -> Result<Option<EntityState>, HostError>;
}

pub trait Host: DeviceRegistry + StateStore + RestoreStore {}

impl<T> Host for T where T: DeviceRegistry + StateStore + RestoreStore {}
