hass_metrics::metrics! {
	pub(crate) struct FilterMetrics {
		pub readings: Counter(
			"energy_cleaner.readings",
			"Raw readings run through the filter",
			("outcome": &'static str),
		),
		pub dropped: Counter(
			"energy_cleaner.dropped",
			"Raw states that were not a number",
		),
		pub resets: Counter(
			"energy_cleaner.resets",
			"Filtered sensors zeroed on request",
		),
		pub accepted_kwh: Histogram(
			"energy_cleaner.accepted_kwh",
			"Energy added to the filtered total per reading",
			(),
		),
	}
}
