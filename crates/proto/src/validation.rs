use core::fmt;
use semval::{context::Context, Invalidity};

#[cfg(feature = "spantrace")]
use tracing_error::SpanTrace;

#[cfg(feature = "backtrace")]
use std::backtrace::Backtrace;

/// Error produced when a value fails validation. Holds every invalidity that
/// was found, not just the first one.
#[derive(Debug)]
pub struct ValidationError<I: Invalidity + Send + Sync> {
	invalidities: Vec<I>,
	#[cfg(feature = "backtrace")]
	backtrace: Backtrace,
	#[cfg(feature = "spantrace")]
	spantrace: SpanTrace,
}

impl<I: Invalidity + Send + Sync> ValidationError<I> {
	pub fn new(invalidities: impl IntoIterator<Item = I>) -> Self {
		Self {
			invalidities: invalidities.into_iter().collect(),
			#[cfg(feature = "backtrace")]
			backtrace: Backtrace::capture(),
			#[cfg(feature = "spantrace")]
			spantrace: SpanTrace::capture(),
		}
	}

	pub fn invalidities(&self) -> &[I] {
		&self.invalidities
	}

	pub fn into_invalidities(self) -> Vec<I> {
		self.invalidities
	}

	#[cfg(feature = "backtrace")]
	#[cfg_attr(doc_cfg, doc(cfg(feature = "backtrace")))]
	pub fn backtrace(&self) -> &Backtrace {
		&self.backtrace
	}

	#[cfg(feature = "spantrace")]
	#[cfg_attr(doc_cfg, doc(cfg(feature = "spantrace")))]
	pub fn spantrace(&self) -> &SpanTrace {
		&self.spantrace
	}
}

impl<I: Invalidity + Send + Sync> From<Context<I>> for ValidationError<I> {
	fn from(context: Context<I>) -> Self {
		Self::new(context)
	}
}

impl<I: Invalidity + Send + Sync> fmt::Display for ValidationError<I> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "validation error: {:?}", &self.invalidities)
	}
}

impl<I: Invalidity + Send + Sync> std::error::Error for ValidationError<I> {}
