use std::{error::Error, fmt};

/// A boxed error used as the `source` of error variants, so the variants stay
/// independent of the concrete host or serializer error types.
///
/// Display and source are forwarded, which makes the wrapper invisible in an
/// error chain.
pub struct DynError(Box<dyn Error + Send + Sync + 'static>);

impl DynError {
	pub fn new<E: Error + Send + Sync + 'static>(error: E) -> Self {
		Self(Box::new(error))
	}

	/// An error that only carries a message, for hosts that report failures as
	/// plain text.
	pub fn msg(message: impl Into<String>) -> Self {
		Self(Box::new(Message(message.into())))
	}

	pub fn is<E: Error + 'static>(&self) -> bool {
		self.0.is::<E>()
	}

	pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
		self.0.downcast_ref::<E>()
	}
}

impl fmt::Debug for DynError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for DynError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&*self.0, f)
	}
}

impl Error for DynError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Error for Message {}
