/// How the most recent input was classified.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Outcome {
	/// Nothing has been applied since the state was created or restored.
	#[default]
	Idle,

	/// First reading of a fresh state. It only establishes the baseline.
	Baseline,

	/// The delta was inside the thresholds. `added` is what went into the
	/// total, which is zero for tolerated decreases.
	Accepted { added: f64 },

	/// A large drop to a small value was taken as a counter restart.
	Rollover,

	/// The reading was ignored.
	Spike,

	/// The reading was out of range, but the reject run reached its limit and
	/// the raw value was adopted as the new baseline.
	SelfHealed,

	/// The operator zeroed the total.
	Reset,
}

impl Outcome {
	#[inline]
	pub const fn reset_detected(&self) -> bool {
		matches!(self, Self::Rollover)
	}

	/// True whenever the delta of the reading was not absorbed into the total.
	#[inline]
	pub const fn spike_ignored(&self) -> bool {
		matches!(self, Self::Spike | Self::SelfHealed)
	}

	#[inline]
	pub const fn added(&self) -> f64 {
		match self {
			Self::Accepted { added } => *added,
			_ => 0.0,
		}
	}

	pub const fn name(&self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Baseline => "baseline",
			Self::Accepted { .. } => "accepted",
			Self::Rollover => "rollover",
			Self::Spike => "spike",
			Self::SelfHealed => "self_healed",
			Self::Reset => "reset",
		}
	}
}
