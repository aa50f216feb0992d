//! Home-assistant integration that wraps the raw energy counters of metering
//! plugs (Zooz ZEN15 / ZEN04) in a filtered sensor whose total only ever goes
//! up.
//!
//! The host platform is reached through the traits in [host]. For every
//! matching device the integration manages three entities: the filtered
//! energy sensor, a spike problem indicator and a reset button. Raw state
//! changes are delivered as [HostEvent]s and processed one at a time.

mod discovery;
mod entity;
mod error;
mod event;
mod integration;
mod metrics;
mod options;
mod resolver;
mod router;

pub mod host;

pub use discovery::{DeviceMatcher, EnergySource, discover_sources};
pub use entity::{EntityIds, FilteredEnergySensor, ManagedDevice, ResetButton, SpikeSensor};
pub use error::{CleanerError, HostError, OptionsError, RestoreError};
pub use event::{ConfigEntry, HostEvent};
pub use integration::EnergyCleaner;
pub use options::{
	CONF_BACKWARD_THRESHOLD_KWH, CONF_DROP_POLICY, CONF_FORWARD_OVERRIDES,
	CONF_FORWARD_THRESHOLD_KWH, CONF_REJECT_RUN_LIMIT, CleanerOptions, OptionsInvalidity,
};
pub use resolver::find_energy_entity;

pub use hass_energy_proto as proto;

#[doc(no_inline)]
pub use hass_energy_filter::{DropPolicy, FilterPolicy, FilterState, Outcome, SelfHeal, Thresholds};

/// Integration domain, used for service calls.
pub const DOMAIN: &str = "zen15_cleaner";

/// Name of the service that zeroes a filtered sensor.
pub const SERVICE_RESET_FILTERED: &str = "reset_filtered";
