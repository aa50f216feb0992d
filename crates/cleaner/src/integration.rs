#[cfg(test)]
mod tests;

use crate::{
	CleanerError, CleanerOptions, ConfigEntry, EntityIds, FilteredEnergySensor, HostEvent,
	ManagedDevice, RestoreError, SERVICE_RESET_FILTERED, discover_sources,
	host::{Host, StateStore},
	metrics::FilterMetrics,
	router::Router,
};
use futures::{StreamExt, pin_mut};
use hass_energy_filter::{FilterSnapshot, Outcome};
use hass_energy_proto::{EntityId, EntityState, RawState};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{Level, debug, info, instrument, trace, warn};

/// The running integration for one config entry.
///
/// Events are handled one at a time, so every device state has a single
/// writer. State writes to the host are fire-and-forget: failures are logged
/// and the filter carries on.
pub struct EnergyCleaner<H: Host> {
	host: H,
	entry: ConfigEntry,
	options: CleanerOptions,
	devices: Router<ManagedDevice>,
	metrics: &'static FilterMetrics,
}

impl<H: Host> fmt::Debug for EnergyCleaner<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EnergyCleaner")
			.field("entry", &self.entry)
			.field("options", &self.options)
			.field("devices", &self.devices)
			.finish_non_exhaustive()
	}
}

impl<H: Host> EnergyCleaner<H> {
	/// Validate the options, discover the metering devices and bring their
	/// filters up to date with the last stored and the current raw state.
	#[instrument(
		level = Level::DEBUG,
		name = "EnergyCleaner::setup",
		skip_all,
		fields(entry.id = %entry.entry_id),
	)]
	pub async fn setup(host: H, entry: ConfigEntry) -> Result<Self, CleanerError> {
		let options = CleanerOptions::from_entry(&entry)?;
		let mut cleaner = Self {
			host,
			entry,
			options,
			devices: Router::new(),
			metrics: FilterMetrics::global(),
		};

		cleaner.load_devices(BTreeMap::new()).await;
		info!(devices = cleaner.devices.len(), "energy cleaner set up");
		Ok(cleaner)
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn options(&self) -> &CleanerOptions {
		&self.options
	}

	pub fn entry(&self) -> &ConfigEntry {
		&self.entry
	}

	pub fn devices(&self) -> impl Iterator<Item = &ManagedDevice> {
		self.devices.values()
	}

	/// The device owning a managed entity (filtered sensor, spike indicator or
	/// reset button).
	pub fn device(&self, entity_id: &EntityId) -> Option<&ManagedDevice> {
		self
			.devices
			.by_entity(entity_id)
			.and_then(|id| self.devices.get(id))
	}

	/// Handle events until the channel closes or a shutdown event arrives.
	#[instrument(level = Level::DEBUG, name = "EnergyCleaner::run", skip_all)]
	pub async fn run(&mut self, receiver: flume::Receiver<HostEvent>) {
		let events = receiver.into_stream();
		pin_mut!(events);

		while let Some(event) = events.next().await {
			if matches!(event, HostEvent::Shutdown) {
				debug!("shutdown requested");
				break;
			}

			if let Err(error) = self.handle(event).await {
				warn!(%error, "failed to handle host event");
			}
		}
	}

	#[instrument(level = Level::TRACE, name = "EnergyCleaner::handle", skip_all)]
	pub async fn handle(&mut self, event: HostEvent) -> Result<(), CleanerError> {
		match event {
			HostEvent::StateChanged {
				entity_id,
				new_state,
			} => {
				self.handle_state_changed(&entity_id, new_state.as_ref());
				Ok(())
			}

			HostEvent::ServiceCall { service, entity_id } => {
				if service != SERVICE_RESET_FILTERED {
					return Err(CleanerError::unknown_service(&service));
				}

				self.reset_filtered(&entity_id)
			}

			HostEvent::ButtonPressed { entity_id } => self.press_button(&entity_id),
			HostEvent::OptionsUpdated(entry) => self.reload(entry).await,
			HostEvent::DeviceRemoved { device_id } => {
				self.remove_device(&device_id);
				Ok(())
			}

			HostEvent::Shutdown => Ok(()),
		}
	}

	/// Run a new state of a raw energy sensor through the filters listening
	/// to it.
	pub fn handle_state_changed(&mut self, entity_id: &EntityId, new_state: Option<&EntityState>) {
		let ids = self.devices.by_raw(entity_id);
		if ids.is_empty() {
			return;
		}

		let Some(raw) = new_state.map(EntityState::raw).and_then(|raw| raw.number()) else {
			trace!(%entity_id, state = ?new_state.map(|state| &state.state), "ignoring non-numeric raw state");
			self.metrics.dropped.add(1);
			return;
		};

		for id in ids {
			if let Some(device) = self.devices.get_mut(id) {
				apply_reading(&self.host, self.metrics, device, raw);
			}
		}
	}

	/// Zero the total of a filtered sensor.
	#[instrument(level = Level::DEBUG, name = "EnergyCleaner::reset_filtered", skip(self))]
	pub fn reset_filtered(&mut self, entity_id: &EntityId) -> Result<(), CleanerError> {
		let device = self
			.devices
			.by_entity(entity_id)
			.and_then(|id| self.devices.get_mut(id))
			.filter(|device| &device.sensor().entity_id == entity_id)
			.ok_or_else(|| CleanerError::unknown_entity(entity_id))?;

		device.reset_filtered();
		self.metrics.resets.add(1);
		info!(%entity_id, "filtered energy reset");
		write_device(&self.host, device);
		Ok(())
	}

	/// A reset button forwards to the filtered sensor of its device.
	pub fn press_button(&mut self, entity_id: &EntityId) -> Result<(), CleanerError> {
		let target = self
			.device(entity_id)
			.filter(|device| &device.button().entity_id == entity_id)
			.map(|device| device.button().target.clone())
			.ok_or_else(|| CleanerError::unknown_entity(entity_id))?;

		self.reset_filtered(&target)
	}

	/// Apply new options. Devices are rediscovered and continue from their
	/// current filter state. Invalid options leave the running configuration
	/// untouched.
	#[instrument(
		level = Level::DEBUG,
		name = "EnergyCleaner::reload",
		skip_all,
		fields(entry.id = %entry.entry_id),
	)]
	pub async fn reload(&mut self, entry: ConfigEntry) -> Result<(), CleanerError> {
		let options = CleanerOptions::from_entry(&entry)?;

		let snapshots: BTreeMap<_, _> = self
			.devices
			.drain()
			.into_iter()
			.map(|device| (device.source().device_id.clone(), device.state().snapshot()))
			.collect();

		self.entry = entry;
		self.options = options;
		self.load_devices(snapshots).await;
		info!(devices = self.devices.len(), "energy cleaner reloaded");
		Ok(())
	}

	/// Forget a device. Returns the removed device, if it was managed.
	pub fn remove_device(&mut self, device_id: &str) -> Option<ManagedDevice> {
		let id = self.devices.by_device(device_id)?;
		let device = self.devices.remove(id)?;
		debug!(device.id = %device_id, "device removed");
		Some(device)
	}

	async fn load_devices(&mut self, mut carried: BTreeMap<Arc<str>, FilterSnapshot>) {
		let mut sources = discover_sources(&self.host, self.options.matcher());
		sources.sort_by(|a, b| a.device_id.cmp(&b.device_id));

		let mut ids = EntityIds::new();
		for source in sources {
			let thresholds = self.options.thresholds_for(&source);
			let mut device = ManagedDevice::new(
				&self.entry.entry_id,
				source,
				&mut ids,
				thresholds,
				*self.options.policy(),
			);

			// A carried over state has already seen the current raw reading.
			match carried.remove(&device.source().device_id) {
				Some(snapshot) => {
					device.restore(&snapshot);
					write_device(&self.host, &device);
				}
				None => {
					if let Some(snapshot) = self.restore_snapshot(&device).await {
						device.restore(&snapshot);
					}

					let current = self.host.state(&device.source().raw_entity_id);
					match current.map(|state| state.raw()) {
						Some(RawState::Number(raw)) => {
							apply_reading(&self.host, self.metrics, &mut device, raw);
						}
						_ => write_device(&self.host, &device),
					}
				}
			}

			debug!(
				device.id = %device.source().device_id,
				raw_entity_id = %device.source().raw_entity_id,
				entity_id = %device.sensor().entity_id,
				"managing energy sensor",
			);
			self.devices.insert(device.routes(), device);
		}
	}

	async fn restore_snapshot(&self, device: &ManagedDevice) -> Option<FilterSnapshot> {
		let entity_id = &device.sensor().entity_id;
		let result: Result<_, RestoreError> = async {
			match self.host.last_state(entity_id).await? {
				Some(state) => FilteredEnergySensor::snapshot_from(&state),
				None => Ok(None),
			}
		}
		.await;

		match result {
			Ok(snapshot) => snapshot,
			Err(error) => {
				warn!(%entity_id, %error, "could not restore filtered energy, starting fresh");
				None
			}
		}
	}
}

fn apply_reading<H: StateStore>(
	host: &H,
	metrics: &FilterMetrics,
	device: &mut ManagedDevice,
	raw: f64,
) {
	let outcome = device.apply_raw(raw);
	metrics.readings.add(1, outcome.name());

	let entity_id = &device.sensor().entity_id;
	let state = device.state();
	match outcome {
		Outcome::Accepted { added } => {
			metrics.accepted_kwh.record(added);
			trace!(%entity_id, raw, added, total = state.virtual_total(), "reading accepted");
		}
		Outcome::Rollover => {
			info!(%entity_id, raw, delta = state.last_delta(), "counter restart detected, new baseline");
		}
		Outcome::Spike => {
			info!(
				%entity_id,
				raw,
				delta = state.last_delta(),
				run = state.reject_run_count(),
				"ignoring implausible reading",
			);
		}
		Outcome::SelfHealed => {
			warn!(%entity_id, raw, "readings stayed out of range, adopting new baseline");
		}
		Outcome::Baseline => debug!(%entity_id, raw, "baseline established"),
		Outcome::Idle | Outcome::Reset => {}
	}

	write_device(host, device);
}

fn write_device<H: StateStore + ?Sized>(host: &H, device: &ManagedDevice) {
	for update in [device.sensor_update(), device.spike_update()] {
		match update.map(|update| host.write_state(update)) {
			Ok(Ok(())) => {}
			Ok(Err(error)) => {
				warn!(device.id = %device.source().device_id, %error, "failed to write state");
			}
			Err(error) => {
				warn!(device.id = %device.source().device_id, %error, "failed to serialize state attributes");
			}
		}
	}
}
