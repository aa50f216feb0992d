
use crate::{DropPolicy, FilterPolicy, FilterSnapshot, Outcome, Thresholds};

/// Running state of the filter for one metering device.
///
/// The state is only ever changed through [FilterState::apply] and
/// [FilterState::reset_filtered], both of which return a new state and leave
/// `self` untouched. `virtual_total` never decreases except through a reset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
	virtual_total: f64,
	last_raw_value: Option<f64>,
	last_delta: f64,
	thresholds: Thresholds,
	reject_run_count: u32,
	spike_ignored_count: u64,
	outcome: Outcome,
}

impl FilterState {
	pub fn new(thresholds: Thresholds) -> Self {
		Self {
			virtual_total: 0.0,
			last_raw_value: None,
			last_delta: 0.0,
			thresholds,
			reject_run_count: 0,
			spike_ignored_count: 0,
			outcome: Outcome::Idle,
		}
	}

	/// Continue from a persisted snapshot. Thresholds always come from the
	/// current configuration, never from the snapshot.
	pub fn restore(thresholds: Thresholds, snapshot: &FilterSnapshot) -> Self {
		Self {
			virtual_total: snapshot.virtual_total,
			last_raw_value: snapshot.last_raw_value,
			reject_run_count: snapshot.reject_run_count,
			spike_ignored_count: snapshot.spike_ignored_count,
			..Self::new(thresholds)
		}
	}

	pub fn snapshot(&self) -> FilterSnapshot {
		FilterSnapshot {
			virtual_total: self.virtual_total,
			last_raw_value: self.last_raw_value,
			reject_run_count: self.reject_run_count,
			spike_ignored_count: self.spike_ignored_count,
		}
	}

	/// Classify a raw reading and return the resulting state.
	///
	/// - The first reading only records the baseline.
	/// - A delta in `[-backward, forward]` is accepted. Positive deltas are
	///   added to the total, negative ones only move the baseline.
	/// - A larger drop to a value in `[0, forward]` is a rollover when the
	///   policy allows it: the value becomes the new baseline and nothing is
	///   added.
	/// - Anything else is a spike. Total and baseline stay put and the reject
	///   run grows. When the run reaches the self-heal limit the value is
	///   adopted as baseline without adding its delta.
	///
	/// `raw` must be finite. Unavailable or non-numeric readings are dropped
	/// before they get here.
	#[must_use]
	pub fn apply(&self, raw: f64, policy: &FilterPolicy) -> Self {
		debug_assert!(raw.is_finite(), "raw readings must be finite");

		let mut next = self.clone();
		let Some(last) = self.last_raw_value else {
			next.last_raw_value = Some(raw);
			next.last_delta = 0.0;
			next.outcome = Outcome::Baseline;
			return next;
		};

		let delta = raw - last;
		next.last_delta = delta;

		if self.thresholds.accepts(delta) {
			let added = delta.max(0.0);
			next.virtual_total += added;
			next.last_raw_value = Some(raw);
			next.reject_run_count = 0;
			next.outcome = Outcome::Accepted { added };
			return next;
		}

		if delta < 0.0 && policy.drop == DropPolicy::Rollover && self.thresholds.is_restart_value(raw)
		{
			next.last_raw_value = Some(raw);
			next.reject_run_count = 0;
			next.outcome = Outcome::Rollover;
			return next;
		}

		next.spike_ignored_count = next.spike_ignored_count.saturating_add(1);
		next.reject_run_count = next.reject_run_count.saturating_add(1);
		next.outcome = match policy.self_heal.limit() {
			Some(limit) if next.reject_run_count >= limit.get() => {
				next.last_raw_value = Some(raw);
				next.reject_run_count = 0;
				Outcome::SelfHealed
			}
			_ => Outcome::Spike,
		};

		next
	}

	/// Zero the total and the counters. The raw baseline is kept, so the next
	/// reading is measured against the last raw value seen before the reset.
	#[must_use]
	pub fn reset_filtered(&self) -> Self {
		Self {
			virtual_total: 0.0,
			reject_run_count: 0,
			spike_ignored_count: 0,
			last_delta: 0.0,
			outcome: Outcome::Reset,
			..self.clone()
		}
	}

	#[inline]
	pub fn virtual_total(&self) -> f64 {
		self.virtual_total
	}

	#[inline]
	pub fn last_raw_value(&self) -> Option<f64> {
		self.last_raw_value
	}

	#[inline]
	pub fn last_delta(&self) -> f64 {
		self.last_delta
	}

	#[inline]
	pub fn thresholds(&self) -> &Thresholds {
		&self.thresholds
	}

	#[inline]
	pub fn reject_run_count(&self) -> u32 {
		self.reject_run_count
	}

	#[inline]
	pub fn spike_ignored_count(&self) -> u64 {
		self.spike_ignored_count
	}

	#[inline]
	pub fn outcome(&self) -> &Outcome {
		&self.outcome
	}

	#[inline]
	pub fn reset_detected(&self) -> bool {
		self.outcome.reset_detected()
	}

	#[inline]
	pub fn spike_ignored(&self) -> bool {
		self.outcome.spike_ignored()
	}
}
