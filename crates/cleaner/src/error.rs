use crate::OptionsInvalidity;
use hass_dyn_error::DynError;
use hass_energy_filter::SnapshotInvalidity;
use hass_energy_proto::{EntityId, ValidationError};
use thiserror::Error;

/// A call into the host platform failed.
#[derive(Debug, Error)]
#[error("host call `{operation}` failed")]
pub struct HostError {
	operation: &'static str,
	source: DynError,
}

impl HostError {
	pub fn new(
		operation: &'static str,
		source: impl std::error::Error + Send + Sync + 'static,
	) -> Self {
		Self {
			operation,
			source: DynError::new(source),
		}
	}

	pub fn msg(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			source: DynError::msg(message),
		}
	}

	pub fn operation(&self) -> &'static str {
		self.operation
	}
}

#[derive(Debug, Error)]
pub enum OptionsError {
	#[error("failed to read config entry options")]
	Deserialize { source: DynError },

	#[error("invalid options")]
	Invalid {
		#[from]
		source: ValidationError<OptionsInvalidity>,
	},
}

impl OptionsError {
	pub(crate) fn deserialize(source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Deserialize {
			source: DynError::new(source),
		}
	}

	/// The invalidities found, empty when the options could not be read at all.
	pub fn invalidities(&self) -> &[OptionsInvalidity] {
		match self {
			Self::Deserialize { .. } => &[],
			Self::Invalid { source } => source.invalidities(),
		}
	}
}

/// The stored state of a filtered sensor could not be turned into a snapshot.
#[derive(Debug, Error)]
pub enum RestoreError {
	#[error("failed to load the last state")]
	Host {
		#[from]
		source: HostError,
	},

	#[error("stored attributes are not a filter snapshot")]
	Unreadable { source: DynError },

	#[error("stored snapshot is invalid")]
	Invalid {
		#[from]
		source: ValidationError<SnapshotInvalidity>,
	},

	#[error("stored state {state:?} is not a number")]
	NotANumber { state: String },
}

impl RestoreError {
	pub(crate) fn unreadable(source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Unreadable {
			source: DynError::new(source),
		}
	}
}

#[derive(Debug, Error)]
pub enum CleanerError {
	#[error("failed to load options")]
	Options {
		#[from]
		source: OptionsError,
	},

	#[error("entity {entity_id} is not managed by zen15_cleaner")]
	UnknownEntity { entity_id: EntityId },

	#[error("unknown service zen15_cleaner.{service}")]
	UnknownService { service: String },
}

impl CleanerError {
	pub(crate) fn unknown_entity(entity_id: &EntityId) -> Self {
		Self::UnknownEntity {
			entity_id: entity_id.clone(),
		}
	}

	pub(crate) fn unknown_service(service: &str) -> Self {
		Self::UnknownService {
			service: service.into(),
		}
	}
}
