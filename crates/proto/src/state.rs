use crate::Attributes;
use serde::{Deserialize, Serialize};

pub const STATE_UNAVAILABLE: &str = "unavailable";
pub const STATE_UNKNOWN: &str = "unknown";
pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";

/// State of an entity as stored by the host: a string value plus attributes.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
	pub state: String,
	#[serde(default)]
	pub attributes: Attributes,
}

impl EntityState {
	pub fn new(state: impl Into<String>) -> Self {
		Self {
			state: state.into(),
			attributes: Attributes::default(),
		}
	}

	pub fn with_attributes(mut self, attributes: Attributes) -> Self {
		self.attributes = attributes;
		self
	}

	#[inline]
	pub fn raw(&self) -> RawState {
		RawState::parse(&self.state)
	}
}

/// A state value interpreted as a numeric reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawState {
	Unavailable,
	Unknown,
	Empty,

	/// Anything that is not a finite number, including `nan` and `inf`.
	Invalid,

	Number(f64),
}

impl RawState {
	pub fn parse(value: &str) -> Self {
		match value.trim() {
			"" => Self::Empty,
			STATE_UNAVAILABLE => Self::Unavailable,
			STATE_UNKNOWN => Self::Unknown,
			value => match value.parse::<f64>() {
				Ok(number) if number.is_finite() => Self::Number(number),
				_ => Self::Invalid,
			},
		}
	}

	#[inline]
	pub const fn number(&self) -> Option<f64> {
		match self {
			Self::Number(number) => Some(*number),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;

	#[test]
	fn parses_numbers() {
		assert_eq!(RawState::parse("12.5"), RawState::Number(12.5));
		assert_eq!(RawState::parse(" 0 "), RawState::Number(0.0));
		assert_eq!(RawState::parse("-3"), RawState::Number(-3.0));
	}

	#[test]
	fn parses_sentinels() {
		assert_eq!(RawState::parse("unavailable"), RawState::Unavailable);
		assert_eq!(RawState::parse("unknown"), RawState::Unknown);
		assert_eq!(RawState::parse(""), RawState::Empty);
	}

	#[test]
	fn non_finite_is_invalid() {
		for value in ["nan", "NaN", "inf", "-infinity", "12kWh", "on"] {
			assert_matches!(RawState::parse(value), RawState::Invalid, "{value}");
		}
	}

	#[test]
	fn entity_state_from_json() {
		let state: EntityState = serde_json::from_str(
			r#"{"state":"4.2","attributes":{"unit_of_measurement":"kWh"}}"#,
		)
		.expect("should parse");

		assert_eq!(state.raw().number(), Some(4.2));
		assert_eq!(state.attributes.unit_of_measurement(), Some("kWh"));
	}
}
