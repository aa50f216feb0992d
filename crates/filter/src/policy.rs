use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// What to do with a drop larger than the backward threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
	/// Treat the drop as a counter rollover when the new raw value is small
	/// (between zero and the forward threshold), and adopt it as the new
	/// baseline. Larger drops are still rejected as spikes.
	#[default]
	Rollover,

	/// Reject every drop as a spike.
	Reject,
}

/// Escape valve for a filter that keeps rejecting readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum SelfHeal {
	/// Keep rejecting forever.
	Disabled,

	/// Adopt the raw value as baseline after this many consecutive rejections.
	After(NonZeroU32),
}

impl SelfHeal {
	pub const DEFAULT_LIMIT: NonZeroU32 = match NonZeroU32::new(12) {
		Some(limit) => limit,
		None => unreachable!(),
	};

	/// A limit of `0` disables self-healing.
	#[inline]
	pub const fn from_limit(limit: u32) -> Self {
		match NonZeroU32::new(limit) {
			Some(limit) => Self::After(limit),
			None => Self::Disabled,
		}
	}

	#[inline]
	pub const fn limit(&self) -> Option<NonZeroU32> {
		match self {
			Self::Disabled => None,
			Self::After(limit) => Some(*limit),
		}
	}

	/// The limit as reported to the host, `0` when disabled.
	#[inline]
	pub const fn limit_value(&self) -> u32 {
		match self {
			Self::Disabled => 0,
			Self::After(limit) => limit.get(),
		}
	}
}

impl Default for SelfHeal {
	#[inline]
	fn default() -> Self {
		Self::After(Self::DEFAULT_LIMIT)
	}
}

impl From<u32> for SelfHeal {
	#[inline]
	fn from(limit: u32) -> Self {
		Self::from_limit(limit)
	}
}

impl From<SelfHeal> for u32 {
	#[inline]
	fn from(self_heal: SelfHeal) -> Self {
		self_heal.limit_value()
	}
}

/// Classification strategy of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterPolicy {
	#[serde(default)]
	pub drop: DropPolicy,
	#[serde(default, rename = "reject_run_limit")]
	pub self_heal: SelfHeal,
}

impl FilterPolicy {
	#[inline]
	pub const fn new(drop: DropPolicy, self_heal: SelfHeal) -> Self {
		Self { drop, self_heal }
	}

	/// Reject everything outside the thresholds and never self-heal.
	#[inline]
	pub const fn plain() -> Self {
		Self::new(DropPolicy::Reject, SelfHeal::Disabled)
	}

	#[inline]
	pub const fn with_drop(self, drop: DropPolicy) -> Self {
		Self { drop, ..self }
	}

	#[inline]
	pub const fn with_self_heal(self, self_heal: SelfHeal) -> Self {
		Self { self_heal, ..self }
	}
}
