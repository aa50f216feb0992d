use crate::{EnergySource, RestoreError, host::StateUpdate, router::Routes};
use hass_energy_filter::{FilterPolicy, FilterSnapshot, FilterState, Outcome, Thresholds};
use hass_energy_proto::{
	Attributes, DeviceClass, EntityId, EntityState, RawState, StateClass, UnitOfEnergy,
	ValidationError,
	state::{STATE_OFF, STATE_ON},
};
use semval::Validate;
use serde::Serialize;
use std::collections::HashSet;

/// Entity slug as the host builds it, lowercase words joined by `_`.
fn slugify(name: &str) -> String {
	slug::slugify(name).replace('-', "_")
}

/// Entity ids handed out during one setup pass.
///
/// Devices are named by their product label more often than not, so two plugs
/// can ask for the same id. Like the host's entity registry, the second one
/// gets `_2` appended, the third `_3`, and so on.
#[derive(Debug, Default)]
pub struct EntityIds {
	taken: HashSet<EntityId>,
}

impl EntityIds {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserve `domain.object_id`, or the first free suffixed variant of it.
	pub fn claim(&mut self, domain: &str, object_id: &str) -> EntityId {
		let entity_id = EntityId::from_parts(domain, object_id);
		if self.taken.insert(entity_id.clone()) {
			return entity_id;
		}

		let mut suffix = 2u32;
		loop {
			let entity_id = EntityId::from_parts(domain, &format!("{object_id}_{suffix}"));
			if self.taken.insert(entity_id.clone()) {
				return entity_id;
			}

			suffix += 1;
		}
	}
}

/// The sensor that reports the virtual total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEnergySensor {
	pub unique_id: String,
	pub name: String,
	pub entity_id: EntityId,
}

impl FilteredEnergySensor {
	pub fn new(source: &EnergySource, ids: &mut EntityIds) -> Self {
		let base = source.base_name();
		Self {
			unique_id: format!("{}_energy_filtered", source.device_id),
			name: format!("{base} Energy Filtered"),
			entity_id: ids.claim("sensor", &format!("{}_energy_filtered", slugify(base))),
		}
	}

	/// Read a snapshot back from the state the sensor had when the host last
	/// stopped. `Ok(None)` means there is nothing to restore.
	///
	/// States written by this sensor carry the whole snapshot in their
	/// attributes. Older states only have a numeric value, which is taken as
	/// the total.
	pub fn snapshot_from(state: &EntityState) -> Result<Option<FilterSnapshot>, RestoreError> {
		let snapshot = if state.attributes.get("virtual_total").is_some() {
			state
				.attributes
				.deserialize_into::<FilterSnapshot>()
				.map_err(RestoreError::unreadable)?
		} else {
			match state.raw() {
				RawState::Number(total) => FilterSnapshot {
					spike_ignored_count: state
						.attributes
						.get("spike_ignored_count")
						.and_then(|count| count.as_u64())
						.unwrap_or_default(),
					..FilterSnapshot::with_total(total)
				},
				RawState::Unavailable | RawState::Unknown | RawState::Empty => return Ok(None),
				RawState::Invalid => {
					return Err(RestoreError::NotANumber {
						state: state.state.clone(),
					});
				}
			}
		};

		snapshot.validate().map_err(ValidationError::from)?;
		Ok(Some(snapshot))
	}
}

/// Problem indicator that turns on once a reading has been ignored, and stays
/// on until the filtered sensor is reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeSensor {
	pub unique_id: String,
	pub name: String,
	pub entity_id: EntityId,
}

impl SpikeSensor {
	pub fn new(source: &EnergySource, ids: &mut EntityIds) -> Self {
		let base = source.base_name();
		Self {
			unique_id: format!("{}_energy_spike", source.device_id),
			name: format!("{base} Energy Spike"),
			entity_id: ids.claim("binary_sensor", &format!("{}_energy_spike", slugify(base))),
		}
	}
}

/// Button that resets the filtered sensor of its device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetButton {
	pub unique_id: String,
	pub name: String,
	pub entity_id: EntityId,
	pub target: EntityId,
}

impl ResetButton {
	pub fn new(
		entry_id: &str,
		source: &EnergySource,
		target: &FilteredEnergySensor,
		ids: &mut EntityIds,
	) -> Self {
		let base = source.base_name();
		Self {
			unique_id: format!("{entry_id}_{}_reset_energy_filtered", source.device_id),
			name: format!("{base} Reset Energy Filtered"),
			entity_id: ids.claim("button", &format!("{}_reset_energy_filtered", slugify(base))),
			target: target.entity_id.clone(),
		}
	}
}

#[derive(Debug, Serialize)]
struct FilteredAttributes<'a> {
	device_class: DeviceClass,
	state_class: StateClass,
	unit_of_measurement: &'static str,
	friendly_name: &'a str,
	raw_entity_id: &'a EntityId,
	virtual_total: f64,
	last_raw_value: Option<f64>,
	last_delta: f64,
	forward_threshold: f64,
	backward_threshold: f64,
	reset_detected: bool,
	spike_ignored: bool,
	reject_run_count: u32,
	reject_run_limit: u32,
	spike_ignored_count: u64,
}

#[derive(Debug, Serialize)]
struct SpikeAttributes<'a> {
	device_class: DeviceClass,
	friendly_name: &'a str,
	raw_entity_id: &'a EntityId,
	forward_threshold: f64,
	spike_ignored_count: u64,
}

/// One metering device with its filter state and the entities it drives.
#[derive(Debug, Clone)]
pub struct ManagedDevice {
	source: EnergySource,
	sensor: FilteredEnergySensor,
	spike: SpikeSensor,
	button: ResetButton,
	policy: FilterPolicy,
	state: FilterState,
}

impl ManagedDevice {
	/// Entity ids are claimed from `ids`, so devices set up in the same pass
	/// never share an entity.
	pub fn new(
		entry_id: &str,
		source: EnergySource,
		ids: &mut EntityIds,
		thresholds: Thresholds,
		policy: FilterPolicy,
	) -> Self {
		let sensor = FilteredEnergySensor::new(&source, ids);
		let spike = SpikeSensor::new(&source, ids);
		let button = ResetButton::new(entry_id, &source, &sensor, ids);

		Self {
			source,
			sensor,
			spike,
			button,
			policy,
			state: FilterState::new(thresholds),
		}
	}

	/// Continue from a snapshot, keeping the configured thresholds.
	pub fn restore(&mut self, snapshot: &FilterSnapshot) {
		self.state = FilterState::restore(*self.state.thresholds(), snapshot);
	}

	/// Feed a raw reading through the filter.
	pub fn apply_raw(&mut self, raw: f64) -> Outcome {
		self.state = self.state.apply(raw, &self.policy);
		*self.state.outcome()
	}

	pub fn reset_filtered(&mut self) {
		self.state = self.state.reset_filtered();
	}

	pub fn source(&self) -> &EnergySource {
		&self.source
	}

	pub fn sensor(&self) -> &FilteredEnergySensor {
		&self.sensor
	}

	pub fn spike(&self) -> &SpikeSensor {
		&self.spike
	}

	pub fn button(&self) -> &ResetButton {
		&self.button
	}

	pub fn state(&self) -> &FilterState {
		&self.state
	}

	pub fn policy(&self) -> &FilterPolicy {
		&self.policy
	}

	pub(crate) fn routes(&self) -> Routes {
		Routes {
			device_id: self.source.device_id.clone(),
			raw_entity_id: self.source.raw_entity_id.clone(),
			entity_ids: vec![
				self.sensor.entity_id.clone(),
				self.spike.entity_id.clone(),
				self.button.entity_id.clone(),
			],
		}
	}

	/// State of the filtered sensor, with the filter state as attributes.
	pub fn sensor_update(&self) -> Result<StateUpdate, serde_json::Error> {
		let state = &self.state;
		let attributes = Attributes::from_serialize(&FilteredAttributes {
			device_class: DeviceClass::Energy,
			state_class: StateClass::TotalIncreasing,
			unit_of_measurement: UnitOfEnergy::KiloWattHour.as_str(),
			friendly_name: &self.sensor.name,
			raw_entity_id: &self.source.raw_entity_id,
			virtual_total: state.virtual_total(),
			last_raw_value: state.last_raw_value(),
			last_delta: state.last_delta(),
			forward_threshold: state.thresholds().forward,
			backward_threshold: state.thresholds().backward,
			reset_detected: state.reset_detected(),
			spike_ignored: state.spike_ignored(),
			reject_run_count: state.reject_run_count(),
			reject_run_limit: self.policy.self_heal.limit_value(),
			spike_ignored_count: state.spike_ignored_count(),
		})?;

		Ok(StateUpdate {
			entity_id: self.sensor.entity_id.clone(),
			state: state.virtual_total().to_string(),
			attributes,
		})
	}

	pub fn spike_update(&self) -> Result<StateUpdate, serde_json::Error> {
		let state = &self.state;
		let attributes = Attributes::from_serialize(&SpikeAttributes {
			device_class: DeviceClass::Problem,
			friendly_name: &self.spike.name,
			raw_entity_id: &self.source.raw_entity_id,
			forward_threshold: state.thresholds().forward,
			spike_ignored_count: state.spike_ignored_count(),
		})?;

		let on = state.spike_ignored_count() > 0;
		Ok(StateUpdate {
			entity_id: self.spike.entity_id.clone(),
			state: if on { STATE_ON } else { STATE_OFF }.to_owned(),
			attributes,
		})
	}
}
