use crate::{
	find_energy_entity,
	host::{DeviceEntry, DeviceRegistry, StateStore},
};
use hass_energy_proto::EntityId;
use std::sync::Arc;
use tracing::debug;

/// Which registry devices are metering plugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMatcher {
	pub manufacturer: String,
	pub models: Vec<String>,
}

impl Default for DeviceMatcher {
	fn default() -> Self {
		Self::new("zooz", ["zen15", "zen04"])
	}
}

impl DeviceMatcher {
	pub fn new(
		manufacturer: impl Into<String>,
		models: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Self {
			manufacturer: manufacturer.into(),
			models: models.into_iter().map(Into::into).collect(),
		}
	}

	/// The manufacturer has to match exactly, the model only has to contain
	/// one of the model tokens. Both compare case-insensitively.
	pub fn matches(&self, device: &DeviceEntry) -> bool {
		let manufacturer = device.manufacturer.as_deref().unwrap_or_default().trim();
		if !manufacturer.eq_ignore_ascii_case(self.manufacturer.trim()) {
			return false;
		}

		let model = device.model.as_deref().unwrap_or_default().to_lowercase();
		self
			.models
			.iter()
			.any(|token| model.contains(&token.trim().to_lowercase()))
	}
}

/// A metering device together with the raw energy sensor it reports through.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergySource {
	pub device_id: Arc<str>,
	pub device_name: Option<String>,
	pub manufacturer: Option<String>,
	pub model: Option<String>,
	pub raw_entity_id: EntityId,
}

impl EnergySource {
	/// Name the managed entities are derived from.
	pub fn base_name(&self) -> &str {
		match self.device_name.as_deref() {
			Some(name) if !name.trim().is_empty() => name.trim(),
			_ => self.raw_entity_id.object_id(),
		}
	}
}

/// Find every matching device that has a usable energy sensor.
pub fn discover_sources<H>(host: &H, matcher: &DeviceMatcher) -> Vec<EnergySource>
where
	H: DeviceRegistry + StateStore + ?Sized,
{
	host
		.devices()
		.into_iter()
		.filter(|device| matcher.matches(device))
		.filter_map(|device| {
			let candidates: Vec<EntityId> = host
				.entities_for_device(&device.id)
				.into_iter()
				.filter(|entity| !entity.disabled && entity.entity_id.domain() == "sensor")
				.map(|entity| entity.entity_id)
				.collect();

			let Some(raw_entity_id) = find_energy_entity(host, &candidates) else {
				debug!(device_id = %device.id, "no energy sensor found for device, skipping");
				return None;
			};

			Some(EnergySource {
				device_name: device.display_name().map(String::from),
				device_id: device.id,
				manufacturer: device.manufacturer,
				model: device.model,
				raw_entity_id,
			})
		})
		.collect()
}
