/// Units of energy the cleaner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOfEnergy {
	KiloWattHour,
}

impl UnitOfEnergy {
	pub const KILO_WATT_HOUR: &'static str = "kWh";

	/// Spellings of kWh seen in the wild on Z-Wave metering devices.
	const KILO_WATT_HOUR_ALIASES: &'static [&'static str] = &["kwh", "kw·h", "kw/h"];

	/// Recognize a `unit_of_measurement` attribute value, case-insensitively.
	pub fn from_attribute(unit: &str) -> Option<Self> {
		let unit = unit.trim().to_lowercase();
		Self::KILO_WATT_HOUR_ALIASES
			.contains(&unit.as_str())
			.then_some(Self::KiloWattHour)
	}

	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::KiloWattHour => Self::KILO_WATT_HOUR,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recognizes_kwh_spellings() {
		for unit in ["kWh", "KWH", "kW·h", "kW/h", " kwh "] {
			assert_eq!(
				UnitOfEnergy::from_attribute(unit),
				Some(UnitOfEnergy::KiloWattHour),
				"{unit}"
			);
		}
	}

	#[test]
	fn rejects_other_units() {
		for unit in ["Wh", "W", "kW", ""] {
			assert_eq!(UnitOfEnergy::from_attribute(unit), None, "{unit}");
		}
	}
}
