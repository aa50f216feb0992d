use crate::{ConfigEntry, DeviceMatcher, EnergySource, OptionsError};
use hass_energy_filter::{
	DropPolicy, FilterPolicy, SelfHeal, Thresholds, ThresholdsInvalidity,
};
use hass_energy_proto::ValidationError;
use semval::{context::Context, Validate, ValidationResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const CONF_FORWARD_THRESHOLD_KWH: &str = "forward_threshold_kwh";
pub const CONF_BACKWARD_THRESHOLD_KWH: &str = "backward_threshold_kwh";
pub const CONF_FORWARD_OVERRIDES: &str = "forward_overrides";
pub const CONF_REJECT_RUN_LIMIT: &str = "reject_run_limit";
pub const CONF_DROP_POLICY: &str = "drop_policy";

/// Settings of one config entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanerOptions {
	pub(crate) thresholds: Thresholds,
	pub(crate) forward_overrides: BTreeMap<String, f64>,
	pub(crate) policy: FilterPolicy,
	pub(crate) matcher: DeviceMatcher,
}

impl Default for CleanerOptions {
	fn default() -> Self {
		Self {
			thresholds: Thresholds::default(),
			forward_overrides: BTreeMap::new(),
			policy: FilterPolicy::default(),
			matcher: DeviceMatcher::default(),
		}
	}
}

impl CleanerOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn forward_threshold_kwh(mut self, forward: f64) -> Self {
		self.thresholds.forward = forward;
		self
	}

	pub fn backward_threshold_kwh(mut self, backward: f64) -> Self {
		self.thresholds.backward = backward;
		self
	}

	/// Override the forward threshold for one device, keyed by device id or by
	/// device name.
	pub fn forward_override(mut self, device: impl Into<String>, forward: f64) -> Self {
		self.forward_overrides.insert(device.into(), forward);
		self
	}

	pub fn reject_run_limit(mut self, limit: u32) -> Self {
		self.policy.self_heal = SelfHeal::from_limit(limit);
		self
	}

	pub fn drop_policy(mut self, drop: DropPolicy) -> Self {
		self.policy.drop = drop;
		self
	}

	pub fn device_matcher(mut self, matcher: DeviceMatcher) -> Self {
		self.matcher = matcher;
		self
	}

	pub fn thresholds(&self) -> &Thresholds {
		&self.thresholds
	}

	pub fn policy(&self) -> &FilterPolicy {
		&self.policy
	}

	pub fn matcher(&self) -> &DeviceMatcher {
		&self.matcher
	}

	/// Thresholds for one device. An override keyed by the device id wins over
	/// one keyed by the device name; names compare case-insensitively.
	pub fn thresholds_for(&self, source: &EnergySource) -> Thresholds {
		let by_id = self.forward_overrides.get(&*source.device_id);
		let by_name = || {
			let name = source.device_name.as_deref()?.trim();
			self
				.forward_overrides
				.iter()
				.find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
				.map(|(_, forward)| forward)
		};

		match by_id.or_else(by_name) {
			Some(forward) => self.thresholds.with_forward(*forward),
			None => self.thresholds,
		}
	}

	pub fn validated(self) -> Result<Self, OptionsError> {
		self.validate().map_err(ValidationError::from)?;
		Ok(self)
	}

	/// Read the options of a config entry. Keys in `options` take precedence
	/// over keys in `data`, missing keys fall back to the defaults.
	pub fn from_entry(entry: &ConfigEntry) -> Result<Self, OptionsError> {
		let mut merged = entry.data.clone();
		merged.extend(entry.options.clone());

		let raw: RawOptions =
			serde_json::from_value(Value::Object(merged)).map_err(OptionsError::deserialize)?;

		let mut options = Self::default();
		if let Some(forward) = raw.forward_threshold_kwh {
			options = options.forward_threshold_kwh(forward);
		}
		if let Some(backward) = raw.backward_threshold_kwh {
			options = options.backward_threshold_kwh(backward);
		}
		if let Some(limit) = raw.reject_run_limit {
			options = options.reject_run_limit(limit);
		}
		if let Some(drop) = raw.drop_policy {
			options = options.drop_policy(drop);
		}

		let mut invalidities = Vec::new();
		match raw.forward_overrides {
			Some(RawOverrides::Map(map)) => options.forward_overrides = map,
			Some(RawOverrides::Text(text)) => {
				let (map, errors) = parse_override_text(&text);
				options.forward_overrides = map;
				invalidities.extend(errors);
			}
			None => {}
		}

		if let Err(context) = options.validate() {
			invalidities.extend(context);
		}

		if invalidities.is_empty() {
			Ok(options)
		} else {
			Err(ValidationError::new(invalidities).into())
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionsInvalidity {
	Thresholds(ThresholdsInvalidity),
	ForwardOverride {
		device: String,
		invalidity: ThresholdsInvalidity,
	},
	OverrideLine {
		line: usize,
	},
	EmptyManufacturer,
}

impl Validate for CleanerOptions {
	type Invalidity = OptionsInvalidity;

	fn validate(&self) -> ValidationResult<Self::Invalidity> {
		let mut context = Context::new().validate_with(&self.thresholds, OptionsInvalidity::Thresholds);

		for (device, forward) in &self.forward_overrides {
			let thresholds = Thresholds::new(*forward, Thresholds::DEFAULT_BACKWARD_KWH);
			context = context.validate_with(&thresholds, |invalidity| {
				OptionsInvalidity::ForwardOverride {
					device: device.clone(),
					invalidity,
				}
			});
		}

		context
			.invalidate_if(
				self.matcher.manufacturer.trim().is_empty(),
				OptionsInvalidity::EmptyManufacturer,
			)
			.into()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptions {
	forward_threshold_kwh: Option<f64>,
	backward_threshold_kwh: Option<f64>,
	forward_overrides: Option<RawOverrides>,
	reject_run_limit: Option<u32>,
	drop_policy: Option<DropPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOverrides {
	Map(BTreeMap<String, f64>),
	Text(String),
}

/// Parse the text form of the overrides, one `Name = value` per line. Blank
/// lines and lines starting with `#` are skipped.
fn parse_override_text(text: &str) -> (BTreeMap<String, f64>, Vec<OptionsInvalidity>) {
	let mut overrides = BTreeMap::new();
	let mut invalidities = Vec::new();

	for (index, line) in text.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		let parsed = line.rsplit_once('=').and_then(|(name, value)| {
			let name = name.trim();
			let value = value.trim().parse::<f64>().ok()?;
			(!name.is_empty()).then(|| (name.to_owned(), value))
		});

		match parsed {
			Some((name, value)) => {
				overrides.insert(name, value);
			}
			None => invalidities.push(OptionsInvalidity::OverrideLine { line: index + 1 }),
		}
	}

	(overrides, invalidities)
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;
	use hass_energy_proto::EntityId;
	use serde_json::json;
	use std::sync::Arc;

	fn entry(data: Value, options: Value) -> ConfigEntry {
		let as_map = |value: Value| match value {
			Value::Object(map) => map,
			_ => Default::default(),
		};

		ConfigEntry::new("entry")
			.with_data(as_map(data))
			.with_options(as_map(options))
	}

	fn source(device_id: &str, name: Option<&str>) -> EnergySource {
		EnergySource {
			device_id: Arc::from(device_id),
			device_name: name.map(String::from),
			manufacturer: Some("Zooz".into()),
			model: Some("ZEN15".into()),
			raw_entity_id: EntityId::from_parts("sensor", "plug_energy"),
		}
	}

	#[test]
	fn defaults() {
		let options = CleanerOptions::from_entry(&ConfigEntry::new("entry")).expect("should load");

		assert_eq!(options.thresholds(), &Thresholds::new(10.0, 0.0));
		assert_eq!(options.policy(), &FilterPolicy::default());
		assert_eq!(options.policy().self_heal.limit_value(), 12);
	}

	#[test]
	fn options_override_data() {
		let options = CleanerOptions::from_entry(&entry(
			json!({ "forward_threshold_kwh": 5.0, "backward_threshold_kwh": 0.5 }),
			json!({ "forward_threshold_kwh": 2.5, "reject_run_limit": 0, "drop_policy": "reject" }),
		))
		.expect("should load");

		assert_eq!(options.thresholds(), &Thresholds::new(2.5, 0.5));
		assert_eq!(options.policy(), &FilterPolicy::plain());
	}

	#[test]
	fn non_positive_forward_is_rejected() {
		let err = CleanerOptions::from_entry(&entry(json!({ "forward_threshold_kwh": 0.0 }), json!({})))
			.expect_err("should be invalid");

		assert_eq!(
			err.invalidities(),
			&[OptionsInvalidity::Thresholds(
				ThresholdsInvalidity::ForwardNotPositive
			)]
		);
	}

	#[test]
	fn wrong_type_fails_to_deserialize() {
		let err = CleanerOptions::from_entry(&entry(json!({ "reject_run_limit": "many" }), json!({})))
			.expect_err("should fail");

		assert_matches!(err, OptionsError::Deserialize { .. });
	}

	#[test]
	fn overrides_from_text() {
		let options = CleanerOptions::from_entry(&entry(
			json!({}),
			json!({ "forward_overrides": "# heaters\nGarage Heater = 25\n\nDryer=15.5\n" }),
		))
		.expect("should load");

		assert_eq!(
			options.thresholds_for(&source("dev1", Some("garage heater"))),
			Thresholds::new(25.0, 0.0)
		);
		assert_eq!(
			options.thresholds_for(&source("dev2", Some("Dryer"))),
			Thresholds::new(15.5, 0.0)
		);
		assert_eq!(
			options.thresholds_for(&source("dev3", Some("Fridge"))),
			Thresholds::new(10.0, 0.0)
		);
	}

	#[test]
	fn malformed_override_lines_are_reported() {
		let err = CleanerOptions::from_entry(&entry(
			json!({}),
			json!({ "forward_overrides": "Dryer = 15\nno separator\n = 3\nHeater = -1" }),
		))
		.expect_err("should be invalid");

		assert_eq!(
			err.invalidities(),
			&[
				OptionsInvalidity::OverrideLine { line: 2 },
				OptionsInvalidity::OverrideLine { line: 3 },
				OptionsInvalidity::ForwardOverride {
					device: "Heater".into(),
					invalidity: ThresholdsInvalidity::ForwardNotPositive,
				},
			]
		);
	}

	#[test]
	fn device_id_override_wins_over_name() {
		let options = CleanerOptions::new()
			.forward_override("Dryer", 15.0)
			.forward_override("dev2", 30.0);

		assert_eq!(
			options.thresholds_for(&source("dev2", Some("Dryer"))),
			Thresholds::new(30.0, 0.0)
		);
	}

	#[test]
	fn overrides_from_map() {
		let options = CleanerOptions::from_entry(&entry(
			json!({ "forward_overrides": { "dev1": 40.0 } }),
			json!({}),
		))
		.expect("should load");

		assert_eq!(
			options.thresholds_for(&source("dev1", None)),
			Thresholds::new(40.0, 0.0)
		);
	}
}
