use semval::{context::Context, Validate, ValidationResult};
use serde::{Deserialize, Serialize};

/// The persisted part of a [FilterState](crate::FilterState).
///
/// The host stores it as entity attributes, so unknown fields are ignored
/// when reading it back.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSnapshot {
	pub virtual_total: f64,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_raw_value: Option<f64>,

	#[serde(default)]
	pub reject_run_count: u32,

	#[serde(default)]
	pub spike_ignored_count: u64,
}

impl FilterSnapshot {
	#[inline]
	pub const fn with_total(virtual_total: f64) -> Self {
		Self {
			virtual_total,
			last_raw_value: None,
			reject_run_count: 0,
			spike_ignored_count: 0,
		}
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SnapshotInvalidity {
	TotalNotFinite,
	TotalNegative,
	LastRawNotFinite,
}

impl Validate for FilterSnapshot {
	type Invalidity = SnapshotInvalidity;

	fn validate(&self) -> ValidationResult<Self::Invalidity> {
		Context::new()
			.invalidate_if(
				!self.virtual_total.is_finite(),
				SnapshotInvalidity::TotalNotFinite,
			)
			.invalidate_if(self.virtual_total < 0.0, SnapshotInvalidity::TotalNegative)
			.invalidate_if(
				self.last_raw_value.is_some_and(|raw| !raw.is_finite()),
				SnapshotInvalidity::LastRawNotFinite,
			)
			.into()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nameof::name_of_type;
	use serde_test::{assert_tokens, Token};

	#[test]
	fn snapshot_serde() {
		assert_tokens(
			&FilterSnapshot {
				virtual_total: 1.5,
				last_raw_value: Some(100.0),
				reject_run_count: 0,
				spike_ignored_count: 2,
			},
			&[
				Token::Struct {
					name: name_of_type!(FilterSnapshot),
					len: 4,
				},
				Token::Str("virtual_total"),
				Token::F64(1.5),
				Token::Str("last_raw_value"),
				Token::Some,
				Token::F64(100.0),
				Token::Str("reject_run_count"),
				Token::U32(0),
				Token::Str("spike_ignored_count"),
				Token::U64(2),
				Token::StructEnd,
			],
		)
	}

	#[test]
	fn reads_back_from_attribute_document() {
		let json = r#"{
			"raw_entity_id": "sensor.plug_energy",
			"virtual_total": 4.25,
			"last_raw_value": null,
			"forward_threshold": 10.0,
			"spike_ignored": false
		}"#;

		let snapshot: FilterSnapshot = serde_json::from_str(json).expect("should parse");
		assert_eq!(snapshot, FilterSnapshot::with_total(4.25));
	}

	#[test]
	fn missing_total_is_an_error() {
		let result = serde_json::from_str::<FilterSnapshot>(r#"{"last_raw_value": 3.0}"#);
		assert!(result.is_err());
	}

	#[test]
	fn negative_total_is_invalid() {
		let err: Vec<_> = FilterSnapshot::with_total(-1.0)
			.validate()
			.expect_err("should be invalid")
			.into_iter()
			.collect();

		assert_eq!(&*err, &[SnapshotInvalidity::TotalNegative]);
	}
}
