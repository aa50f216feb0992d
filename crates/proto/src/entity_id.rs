use crate::ValidationError;
use core::{fmt, str::FromStr};
use semval::{context::Context, Validate, ValidationResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A home-assistant entity id, `<domain>.<object_id>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(Arc<str>);

impl EntityId {
	/// Build an id from parts that are already known to be well formed.
	pub fn from_parts(domain: &str, object_id: &str) -> Self {
		EntityId(Arc::from(format!("{domain}.{object_id}")))
	}

	pub fn parse(value: &str) -> Result<Self, ValidationError<EntityIdInvalidity>> {
		let id = EntityId(Arc::from(value));
		id.validate()?;
		Ok(id)
	}

	#[inline]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn domain(&self) -> &str {
		self.split().0
	}

	pub fn object_id(&self) -> &str {
		self.split().1
	}

	fn split(&self) -> (&str, &str) {
		self.0.split_once('.').unwrap_or(("", &self.0))
	}
}

impl fmt::Debug for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&*self.0, f)
	}
}

impl AsRef<str> for EntityId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl FromStr for EntityId {
	type Err = ValidationError<EntityIdInvalidity>;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for EntityId {
	type Error = ValidationError<EntityIdInvalidity>;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<EntityId> for String {
	fn from(value: EntityId) -> Self {
		String::from(&*value.0)
	}
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EntityIdInvalidity {
	Empty,
	MissingDomain,
	MissingObjectId,
	InvalidCharacter,
}

fn is_slug_char(c: char) -> bool {
	c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

impl Validate for EntityId {
	type Invalidity = EntityIdInvalidity;

	fn validate(&self) -> ValidationResult<Self::Invalidity> {
		let (domain, object_id) = match self.0.split_once('.') {
			Some(parts) => parts,
			None => ("", &*self.0),
		};

		Context::new()
			.invalidate_if(self.0.is_empty(), EntityIdInvalidity::Empty)
			.invalidate_if(
				!self.0.is_empty() && domain.is_empty(),
				EntityIdInvalidity::MissingDomain,
			)
			.invalidate_if(
				!self.0.is_empty() && object_id.is_empty(),
				EntityIdInvalidity::MissingObjectId,
			)
			.invalidate_if(
				!domain.chars().all(is_slug_char) || !object_id.chars().all(is_slug_char),
				EntityIdInvalidity::InvalidCharacter,
			)
			.into()
	}
}
