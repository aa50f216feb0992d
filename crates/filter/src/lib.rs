//! Delta filter that turns a misbehaving cumulative energy counter into a
//! monotonic "virtual" total.
//!
//! Every raw reading is compared against the last accepted one. Deltas inside
//! the configured [Thresholds] count as consumption, small restarts of the
//! counter can be adopted as a new baseline, and everything else is ignored as
//! a spike. See [FilterState::apply] for the exact rules.

pub mod outcome;
pub mod policy;
pub mod snapshot;
pub mod state;
pub mod thresholds;

#[doc(no_inline)]
pub use outcome::Outcome;
#[doc(no_inline)]
pub use policy::{DropPolicy, FilterPolicy, SelfHeal};
#[doc(no_inline)]
pub use snapshot::{FilterSnapshot, SnapshotInvalidity};
#[doc(no_inline)]
pub use state::FilterState;
#[doc(no_inline)]
pub use thresholds::{Thresholds, ThresholdsInvalidity};
