use hass_energy_proto::{EntityId, EntityState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A config entry of the integration. `options` holds what the user changed
/// after setup and takes precedence over `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
	pub entry_id: String,
	#[serde(default)]
	pub data: Map<String, Value>,
	#[serde(default)]
	pub options: Map<String, Value>,
}

impl ConfigEntry {
	pub fn new(entry_id: impl Into<String>) -> Self {
		Self {
			entry_id: entry_id.into(),
			data: Map::new(),
			options: Map::new(),
		}
	}

	pub fn with_data(mut self, data: Map<String, Value>) -> Self {
		self.data = data;
		self
	}

	pub fn with_options(mut self, options: Map<String, Value>) -> Self {
		self.options = options;
		self
	}

	pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.options.insert(key.into(), value.into());
		self
	}
}

/// Something that happened on the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
	/// An entity changed state. `new_state` is `None` when the entity was
	/// removed.
	StateChanged {
		entity_id: EntityId,
		new_state: Option<EntityState>,
	},

	/// A service of the integration's domain was called for one entity.
	ServiceCall { service: String, entity_id: EntityId },

	ButtonPressed { entity_id: EntityId },

	OptionsUpdated(ConfigEntry),

	DeviceRemoved { device_id: Arc<str> },

	Shutdown,
}

impl HostEvent {
	pub fn state_changed(entity_id: EntityId, state: impl Into<String>) -> Self {
		Self::StateChanged {
			entity_id,
			new_state: Some(EntityState::new(state)),
		}
	}
}
