use crate::{DeviceClass, StateClass, UnitOfEnergy};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::fmt;

/// Attribute map attached to an entity state.
#[derive(Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
	pub const DEVICE_CLASS: &'static str = "device_class";
	pub const STATE_CLASS: &'static str = "state_class";
	pub const UNIT_OF_MEASUREMENT: &'static str = "unit_of_measurement";
	pub const FRIENDLY_NAME: &'static str = "friendly_name";

	pub fn new() -> Self {
		Self::default()
	}

	/// Serialize `value` into an attribute map. Fails unless `value` serializes
	/// to an object.
	pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
		match serde_json::to_value(value)? {
			Value::Object(map) => Ok(Self(map)),
			other => Err(<serde_json::Error as serde::ser::Error>::custom(
				format_args!("attributes must serialize to an object, got {other}"),
			)),
		}
	}

	/// Read the whole attribute map back into a typed document.
	pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		serde_json::from_value(Value::Object(self.0.clone()))
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(Value::as_str)
	}

	pub fn get_f64(&self, key: &str) -> Option<f64> {
		self.get(key).and_then(Value::as_f64)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(key.into(), value.into())
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.0.remove(key)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub fn device_class(&self) -> Option<DeviceClass> {
		let Ok(class) = self.get_str(Self::DEVICE_CLASS)?.parse::<DeviceClass>();
		Some(class)
	}

	pub fn state_class(&self) -> StateClass {
		match self.get_str(Self::STATE_CLASS) {
			Some(value) => {
				let Ok(class) = value.parse::<StateClass>();
				class
			}
			None => StateClass::None,
		}
	}

	pub fn unit_of_measurement(&self) -> Option<&str> {
		self.get_str(Self::UNIT_OF_MEASUREMENT)
	}

	pub fn energy_unit(&self) -> Option<UnitOfEnergy> {
		self.unit_of_measurement().and_then(UnitOfEnergy::from_attribute)
	}

	pub fn friendly_name(&self) -> Option<&str> {
		self.get_str(Self::FRIENDLY_NAME)
	}
}

impl fmt::Debug for Attributes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

impl FromIterator<(String, Value)> for Attributes {
	fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}
