use core::{fmt, str::FromStr};

/// The type of data an entity represents. Only the classes the energy cleaner
/// reads or writes have their own variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceClass {
	/// Current in A.
	Current,

	/// Energy in Wh or kWh.
	Energy,

	/// Power in W or kW.
	Power,

	/// Voltage in V.
	Voltage,

	/// Binary sensor: `on` means a problem was detected.
	Problem,

	/// Any other class reported by the host.
	Other(String),
}

impl DeviceClass {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Current => "current",
			Self::Energy => "energy",
			Self::Power => "power",
			Self::Voltage => "voltage",
			Self::Problem => "problem",
			Self::Other(s) => s,
		}
	}

	#[inline]
	pub const fn is_energy(&self) -> bool {
		matches!(self, Self::Energy)
	}
}

impl FromStr for DeviceClass {
	type Err = core::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"current" => Self::Current,
			"energy" => Self::Energy,
			"power" => Self::Power,
			"voltage" => Self::Voltage,
			"problem" => Self::Problem,
			other => Self::Other(other.into()),
		})
	}
}

impl fmt::Display for DeviceClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl serde::Serialize for DeviceClass {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> serde::Deserialize<'de> for DeviceClass {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
		let Ok(class) = value.parse::<DeviceClass>();
		Ok(class)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_test::{assert_tokens, Token};

	#[test]
	fn energy_serde_as_str() {
		assert_tokens(&DeviceClass::Energy, &[Token::Str("energy")])
	}

	#[test]
	fn unknown_class_is_kept() {
		assert_tokens(
			&DeviceClass::Other("battery".into()),
			&[Token::Str("battery")],
		)
	}
}
