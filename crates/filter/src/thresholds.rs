use semval::{context::Context, Validate, ValidationResult};
use serde::{Deserialize, Serialize};

/// Plausibility window for the change between two consecutive raw readings,
/// in kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
	/// Largest increase that is still counted as real consumption.
	pub forward: f64,

	/// Largest decrease that is tolerated as noise. Tolerated decreases never
	/// subtract from the total, they only move the baseline down.
	pub backward: f64,
}

impl Thresholds {
	pub const DEFAULT_FORWARD_KWH: f64 = 10.0;
	pub const DEFAULT_BACKWARD_KWH: f64 = 0.0;

	#[inline]
	pub const fn new(forward: f64, backward: f64) -> Self {
		Self { forward, backward }
	}

	#[inline]
	pub const fn with_forward(self, forward: f64) -> Self {
		Self { forward, ..self }
	}

	/// Whether `delta` lies inside `[-backward, forward]`.
	#[inline]
	pub fn accepts(&self, delta: f64) -> bool {
		delta >= -self.backward && delta <= self.forward
	}

	/// Whether `raw` is small enough to be a counter that started over.
	#[inline]
	pub fn is_restart_value(&self, raw: f64) -> bool {
		(0.0..=self.forward).contains(&raw)
	}
}

impl Default for Thresholds {
	#[inline]
	fn default() -> Self {
		Self::new(Self::DEFAULT_FORWARD_KWH, Self::DEFAULT_BACKWARD_KWH)
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThresholdsInvalidity {
	ForwardNotFinite,
	ForwardNotPositive,
	BackwardNotFinite,
	BackwardNegative,
}

impl Validate for Thresholds {
	type Invalidity = ThresholdsInvalidity;

	fn validate(&self) -> ValidationResult<Self::Invalidity> {
		Context::new()
			.invalidate_if(
				!self.forward.is_finite(),
				ThresholdsInvalidity::ForwardNotFinite,
			)
			.invalidate_if(
				self.forward.is_finite() && self.forward <= 0.0,
				ThresholdsInvalidity::ForwardNotPositive,
			)
			.invalidate_if(
				!self.backward.is_finite(),
				ThresholdsInvalidity::BackwardNotFinite,
			)
			.invalidate_if(
				self.backward.is_finite() && self.backward < 0.0,
				ThresholdsInvalidity::BackwardNegative,
			)
			.into()
	}
}
