use super::*;
use crate::{
	OptionsInvalidity, Thresholds,
	host::{DeviceEntry, EntityEntry, MemoryHost},
};
use assert_matches::assert_matches;
use hass_energy_proto::Attributes;
use serde_json::json;

fn raw_id() -> EntityId {
	EntityId::from_parts("sensor", "dryer_plug_electric_consumption_kwh")
}

fn filtered_id() -> EntityId {
	EntityId::from_parts("sensor", "dryer_energy_filtered")
}

fn spike_id() -> EntityId {
	EntityId::from_parts("binary_sensor", "dryer_energy_spike")
}

fn button_id() -> EntityId {
	EntityId::from_parts("button", "dryer_reset_energy_filtered")
}

fn raw_state(value: &str) -> EntityState {
	EntityState::new(value).with_attributes(
		Attributes::new()
			.with(Attributes::UNIT_OF_MEASUREMENT, "kWh")
			.with(Attributes::DEVICE_CLASS, "energy")
			.with(Attributes::STATE_CLASS, "total_increasing"),
	)
}

fn host_with_plug(raw: &str) -> MemoryHost {
	let host = MemoryHost::new();
	host.add_device(
		DeviceEntry::new("dev1")
			.manufacturer("Zooz")
			.model("ZEN15")
			.name("Dryer"),
	);
	host.add_entity(EntityEntry::new(raw_id(), "dev1"));
	host.set_state(raw_id(), raw_state(raw));
	host
}

fn filtered(cleaner: &EnergyCleaner<MemoryHost>) -> EntityState {
	cleaner
		.host()
		.state(&filtered_id())
		.expect("filtered sensor should have a state")
}

fn total_of(cleaner: &EnergyCleaner<MemoryHost>, entity_id: &EntityId) -> Option<f64> {
	cleaner
		.host()
		.state(entity_id)
		.and_then(|state| state.raw().number())
}

fn total(cleaner: &EnergyCleaner<MemoryHost>) -> f64 {
	filtered(cleaner).raw().number().expect("total should be a number")
}

async fn reading(cleaner: &mut EnergyCleaner<MemoryHost>, value: &str) {
	cleaner
		.handle(HostEvent::state_changed(raw_id(), value))
		.await
		.expect("state change should be handled");
}

#[tokio::test]
async fn setup_takes_baseline_from_current_raw_state() {
	let cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_eq!(cleaner.devices().count(), 1);
	assert_eq!(total(&cleaner), 0.0);

	let state = filtered(&cleaner);
	assert_eq!(state.attributes.get_f64("last_raw_value"), Some(100.0));
	assert_eq!(
		state.attributes.get_str("raw_entity_id"),
		Some(raw_id().as_str())
	);

	let spike = cleaner.host().state(&spike_id()).expect("spike sensor should have a state");
	assert_eq!(spike.state, "off");
}

#[tokio::test]
async fn filters_readings() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	reading(&mut cleaner, "108").await;
	assert_eq!(total(&cleaner), 8.0);

	reading(&mut cleaner, "150").await;
	assert_eq!(total(&cleaner), 8.0);
	let state = filtered(&cleaner);
	assert_eq!(state.attributes.get("spike_ignored"), Some(&json!(true)));
	assert_eq!(state.attributes.get("reject_run_count"), Some(&json!(1)));
	assert_eq!(
		cleaner.host().state(&spike_id()).map(|state| state.state),
		Some("on".to_owned())
	);

	reading(&mut cleaner, "109.5").await;
	assert_eq!(total(&cleaner), 9.5);
	assert_eq!(filtered(&cleaner).attributes.get("spike_ignored"), Some(&json!(false)));
}

#[tokio::test]
async fn unavailable_states_are_ignored() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("unavailable"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_eq!(total(&cleaner), 0.0);
	cleaner.host().take_written();

	for value in ["unavailable", "unknown", "", "garbage"] {
		reading(&mut cleaner, value).await;
	}
	cleaner
		.handle(HostEvent::StateChanged {
			entity_id: raw_id(),
			new_state: None,
		})
		.await
		.expect("removal should be handled");

	assert!(cleaner.host().written().is_empty());

	reading(&mut cleaner, "50").await;
	reading(&mut cleaner, "51").await;
	assert_eq!(total(&cleaner), 1.0);
}

#[tokio::test]
async fn unrelated_entities_are_ignored() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");
	cleaner.host().take_written();

	cleaner
		.handle(HostEvent::state_changed(EntityId::from_parts("sensor", "other"), "5"))
		.await
		.expect("state change should be handled");

	assert!(cleaner.host().written().is_empty());
}

#[tokio::test]
async fn restores_from_stored_state() {
	let host = host_with_plug("205");
	host.set_restore_state(
		filtered_id(),
		EntityState::new("12.5").with_attributes(
			Attributes::new()
				.with("virtual_total", 12.5)
				.with("last_raw_value", 200.0)
				.with("spike_ignored_count", 2),
		),
	);

	let cleaner = EnergyCleaner::setup(host, ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_eq!(total(&cleaner), 17.5);
	assert_eq!(
		filtered(&cleaner).attributes.get("spike_ignored_count"),
		Some(&json!(2))
	);
	assert_eq!(
		cleaner.host().state(&spike_id()).map(|state| state.state),
		Some("on".to_owned())
	);
}

#[tokio::test]
async fn unreadable_stored_state_starts_fresh() {
	let host = host_with_plug("205");
	host.set_restore_state(filtered_id(), EntityState::new("not a number"));

	let cleaner = EnergyCleaner::setup(host, ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_eq!(total(&cleaner), 0.0);
	assert_eq!(
		filtered(&cleaner).attributes.get_f64("last_raw_value"),
		Some(205.0)
	);
}

#[tokio::test]
async fn reset_via_service_and_button() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	reading(&mut cleaner, "105").await;
	assert_eq!(total(&cleaner), 5.0);

	cleaner
		.handle(HostEvent::ServiceCall {
			service: SERVICE_RESET_FILTERED.into(),
			entity_id: filtered_id(),
		})
		.await
		.expect("reset should succeed");
	assert_eq!(total(&cleaner), 0.0);

	reading(&mut cleaner, "107").await;
	assert_eq!(total(&cleaner), 2.0);

	cleaner
		.handle(HostEvent::ButtonPressed {
			entity_id: button_id(),
		})
		.await
		.expect("button press should succeed");
	assert_eq!(total(&cleaner), 0.0);
	assert_eq!(filtered(&cleaner).attributes.get_f64("last_raw_value"), Some(107.0));
}

#[tokio::test]
async fn reset_of_unknown_entities() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_matches!(
		cleaner.reset_filtered(&EntityId::from_parts("sensor", "kitchen_energy_filtered")),
		Err(CleanerError::UnknownEntity { .. })
	);

	// only the filtered sensor itself is a reset target
	assert_matches!(
		cleaner.reset_filtered(&spike_id()),
		Err(CleanerError::UnknownEntity { .. })
	);

	assert_matches!(
		cleaner.press_button(&filtered_id()),
		Err(CleanerError::UnknownEntity { .. })
	);

	assert_matches!(
		cleaner
			.handle(HostEvent::ServiceCall {
				service: "recalibrate".into(),
				entity_id: filtered_id(),
			})
			.await,
		Err(CleanerError::UnknownService { service }) if service == "recalibrate"
	);
}

#[tokio::test]
async fn device_removal_drops_routing() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	cleaner
		.handle(HostEvent::DeviceRemoved {
			device_id: "dev1".into(),
		})
		.await
		.expect("removal should be handled");

	assert_eq!(cleaner.devices().count(), 0);
	assert!(cleaner.device(&filtered_id()).is_none());
	cleaner.host().take_written();

	reading(&mut cleaner, "105").await;
	assert!(cleaner.host().written().is_empty());
	assert!(cleaner.remove_device("dev1").is_none());
}

#[tokio::test]
async fn options_update_keeps_the_total() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	reading(&mut cleaner, "115").await;
	assert_eq!(total(&cleaner), 0.0);

	cleaner
		.handle(HostEvent::OptionsUpdated(
			ConfigEntry::new("entry").with_option("forward_overrides", "Dryer = 20"),
		))
		.await
		.expect("reload should succeed");

	let device = cleaner.device(&filtered_id()).expect("device should be managed");
	assert_eq!(device.state().thresholds(), &Thresholds::new(20.0, 0.0));

	reading(&mut cleaner, "116").await;
	assert_eq!(total(&cleaner), 16.0);
}

#[tokio::test]
async fn invalid_options_keep_running_configuration() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	let err = cleaner
		.reload(ConfigEntry::new("entry").with_option("backward_threshold_kwh", -1.0))
		.await
		.expect_err("reload should fail");

	assert_matches!(err, CleanerError::Options { source } => {
		assert_eq!(
			source.invalidities(),
			&[OptionsInvalidity::Thresholds(
				hass_energy_filter::ThresholdsInvalidity::BackwardNegative
			)]
		);
	});
	assert_eq!(cleaner.devices().count(), 1);
	assert_eq!(cleaner.options().thresholds(), &Thresholds::default());
}

#[tokio::test]
async fn setup_rejects_invalid_options() {
	let result = EnergyCleaner::setup(
		host_with_plug("100"),
		ConfigEntry::new("entry").with_option("forward_threshold_kwh", 0.0),
	)
	.await;

	assert_matches!(result, Err(CleanerError::Options { .. }));
}

#[tokio::test]
async fn write_failures_do_not_stop_the_filter() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	cleaner.host().fail_writes(true);
	reading(&mut cleaner, "103").await;
	cleaner.host().fail_writes(false);
	reading(&mut cleaner, "104").await;

	assert_eq!(total(&cleaner), 4.0);
}

#[tokio::test]
async fn run_processes_events_until_shutdown() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	let (sender, receiver) = flume::unbounded();
	for event in [
		HostEvent::state_changed(raw_id(), "101"),
		HostEvent::state_changed(raw_id(), "unavailable"),
		HostEvent::ServiceCall {
			service: "bogus".into(),
			entity_id: filtered_id(),
		},
		HostEvent::state_changed(raw_id(), "103"),
		HostEvent::Shutdown,
		HostEvent::state_changed(raw_id(), "105"),
	] {
		sender.send(event).expect("channel should be open");
	}

	cleaner.run(receiver).await;
	assert_eq!(total(&cleaner), 3.0);
}

#[tokio::test]
async fn run_ends_when_the_channel_closes() {
	let mut cleaner = EnergyCleaner::setup(host_with_plug("100"), ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	let (sender, receiver) = flume::unbounded();
	sender
		.send(HostEvent::state_changed(raw_id(), "102"))
		.expect("channel should be open");
	drop(sender);

	cleaner.run(receiver).await;
	assert_eq!(total(&cleaner), 2.0);
}

#[tokio::test]
async fn devices_without_energy_sensor_are_skipped() {
	let host = MemoryHost::new();
	host.add_device(DeviceEntry::new("dev1").manufacturer("Zooz").model("ZEN15"));
	let power = EntityId::from_parts("sensor", "plug_power");
	host.add_entity(EntityEntry::new(power.clone(), "dev1"));
	host.set_state(
		power,
		EntityState::new("12").with_attributes(
			Attributes::new()
				.with(Attributes::UNIT_OF_MEASUREMENT, "W")
				.with(Attributes::DEVICE_CLASS, "power"),
		),
	);

	let cleaner = EnergyCleaner::setup(host, ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	assert_eq!(cleaner.devices().count(), 0);
	assert!(cleaner.host().written().is_empty());
}

#[tokio::test]
async fn plugs_sharing_a_name_stay_apart() {
	let host = MemoryHost::new();
	let raws = [
		EntityId::from_parts("sensor", "plug_a_electric_consumption_kwh"),
		EntityId::from_parts("sensor", "plug_b_electric_consumption_kwh"),
	];
	for ((device_id, raw), value) in ["devA", "devB"].into_iter().zip(&raws).zip(["100", "500"]) {
		host.add_device(
			DeviceEntry::new(device_id)
				.manufacturer("Zooz")
				.model("ZEN15")
				.name("Heavy Duty Smart Plug"),
		);
		host.add_entity(EntityEntry::new(raw.clone(), device_id));
		host.set_state(raw.clone(), raw_state(value));
	}

	let mut cleaner = EnergyCleaner::setup(host, ConfigEntry::new("entry"))
		.await
		.expect("setup should succeed");

	let first = EntityId::from_parts("sensor", "heavy_duty_smart_plug_energy_filtered");
	let second = EntityId::from_parts("sensor", "heavy_duty_smart_plug_energy_filtered_2");
	let device_of = |entity_id: &EntityId| {
		cleaner
			.device(entity_id)
			.map(|device| device.source().device_id.to_string())
	};
	assert_eq!(device_of(&first).as_deref(), Some("devA"));
	assert_eq!(device_of(&second).as_deref(), Some("devB"));

	cleaner
		.handle(HostEvent::state_changed(raws[0].clone(), "105"))
		.await
		.expect("state change should be handled");
	cleaner
		.handle(HostEvent::state_changed(raws[1].clone(), "501"))
		.await
		.expect("state change should be handled");

	assert_eq!(total_of(&cleaner, &first), Some(5.0));
	assert_eq!(total_of(&cleaner, &second), Some(1.0));

	cleaner.reset_filtered(&first).expect("reset should succeed");
	assert_eq!(total_of(&cleaner, &first), Some(0.0));
	assert_eq!(total_of(&cleaner, &second), Some(1.0));
}

#[tokio::test]
async fn options_update_does_not_replay_the_current_reading() {
	let mut cleaner = EnergyCleaner::setup(
		host_with_plug("100"),
		ConfigEntry::new("entry").with_option("reject_run_limit", 2),
	)
	.await
	.expect("setup should succeed");

	cleaner.host().set_state(raw_id(), raw_state("150"));
	reading(&mut cleaner, "150").await;
	assert_eq!(filtered(&cleaner).attributes.get("reject_run_count"), Some(&json!(1)));

	for _ in 0..2 {
		cleaner
			.handle(HostEvent::OptionsUpdated(
				ConfigEntry::new("entry").with_option("reject_run_limit", 2),
			))
			.await
			.expect("reload should succeed");
	}

	let state = filtered(&cleaner);
	assert_eq!(state.attributes.get("reject_run_count"), Some(&json!(1)));
	assert_eq!(state.attributes.get("spike_ignored_count"), Some(&json!(1)));
	assert_eq!(state.attributes.get_f64("last_raw_value"), Some(100.0));
}
