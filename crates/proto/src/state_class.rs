use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Classification of a sensor's state for long term statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateClass {
	/// Default - unspecified state class.
	None,

	/// The state represents _a measurement in present time_, for example the
	/// current power draw of a plug.
	#[serde(rename = "measurement")]
	Measurement,

	/// A total amount that can both increase and decrease, e.g. a net energy
	/// meter.
	#[serde(rename = "total")]
	Total,

	/// Similar to [Total][StateClass::Total], with the restriction that the
	/// state represents a monotonically increasing positive total, e.g. the
	/// lifetime energy consumption of a plug. This is what the raw counters of
	/// metering plugs claim to be, and what the filtered sensor actually is.
	#[serde(rename = "total_increasing")]
	TotalIncreasing,
}

impl StateClass {
	#[inline]
	pub const fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	#[inline]
	pub const fn is_total_increasing(&self) -> bool {
		matches!(self, Self::TotalIncreasing)
	}

	pub const fn as_str(&self) -> Option<&'static str> {
		match self {
			Self::None => None,
			Self::Measurement => Some("measurement"),
			Self::Total => Some("total"),
			Self::TotalIncreasing => Some("total_increasing"),
		}
	}
}

impl Default for StateClass {
	#[inline]
	fn default() -> Self {
		Self::None
	}
}

impl FromStr for StateClass {
	type Err = core::convert::Infallible;

	/// Unknown state classes map to [StateClass::None].
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"measurement" => Self::Measurement,
			"total" => Self::Total,
			"total_increasing" => Self::TotalIncreasing,
			_ => Self::None,
		})
	}
}
