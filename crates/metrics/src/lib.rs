use opentelemetry::metrics as otel;
use opentelemetry::{Key, KeyValue, Value};

pub trait MetricField: Sized {
	fn into_value(self) -> Value;
}

impl MetricField for String {
	fn into_value(self) -> Value {
		Value::from(self)
	}
}

impl MetricField for &'static str {
	fn into_value(self) -> Value {
		Value::from(self)
	}
}

impl MetricField for u32 {
	fn into_value(self) -> Value {
		Value::from(self as i64)
	}
}

impl MetricField for i64 {
	fn into_value(self) -> Value {
		Value::from(self)
	}
}

impl MetricField for f64 {
	fn into_value(self) -> Value {
		Value::from(self)
	}
}

impl MetricField for bool {
	fn into_value(self) -> Value {
		Value::from(self)
	}
}

/// Label set of an instrument, as a tuple of [MetricField] types.
pub trait MetricFields {
	type Names;
	type Keys;

	fn keys(names: Self::Names) -> Self::Keys;
}

impl MetricFields for () {
	type Names = [&'static str; 0];
	type Keys = [Key; 0];

	fn keys(_: Self::Names) -> Self::Keys {
		[]
	}
}

impl<T1> MetricFields for (T1,)
where
	T1: MetricField,
{
	type Names = [&'static str; 1];
	type Keys = [Key; 1];

	fn keys(names: Self::Names) -> Self::Keys {
		let [n0] = names;
		[Key::from_static_str(n0)]
	}
}

impl<T1, T2> MetricFields for (T1, T2)
where
	T1: MetricField,
	T2: MetricField,
{
	type Names = [&'static str; 2];
	type Keys = [Key; 2];

	fn keys(names: Self::Names) -> Self::Keys {
		let [n0, n1] = names;
		[Key::from_static_str(n0), Key::from_static_str(n1)]
	}
}

pub struct Counter<T: MetricFields> {
	inner: otel::Counter<u64>,
	keys: <T as MetricFields>::Keys,
}

impl<T: MetricFields> Counter<T> {
	pub fn new(
		meter: &otel::Meter,
		name: &'static str,
		description: &'static str,
		field_names: <T as MetricFields>::Names,
	) -> Self {
		let inner = meter.u64_counter(name).with_description(description).build();
		Self {
			inner,
			keys: T::keys(field_names),
		}
	}
}

impl Counter<()> {
	pub fn add(&self, value: u64) {
		self.inner.add(value, &[])
	}
}

impl<T1> Counter<(T1,)>
where
	T1: MetricField,
{
	pub fn add(&self, value: u64, field1: T1) {
		let [k0] = &self.keys;
		self.inner
			.add(value, &[KeyValue::new(k0.clone(), field1.into_value())])
	}
}

impl<T1, T2> Counter<(T1, T2)>
where
	T1: MetricField,
	T2: MetricField,
{
	pub fn add(&self, value: u64, field1: T1, field2: T2) {
		let [k0, k1] = &self.keys;
		self.inner.add(
			value,
			&[
				KeyValue::new(k0.clone(), field1.into_value()),
				KeyValue::new(k1.clone(), field2.into_value()),
			],
		)
	}
}

pub struct Histogram<T: MetricFields> {
	inner: otel::Histogram<f64>,
	keys: <T as MetricFields>::Keys,
}

impl<T: MetricFields> Histogram<T> {
	pub fn new(
		meter: &otel::Meter,
		name: &'static str,
		description: &'static str,
		field_names: <T as MetricFields>::Names,
	) -> Self {
		let inner = meter
			.f64_histogram(name)
			.with_description(description)
			.build();
		Self {
			inner,
			keys: T::keys(field_names),
		}
	}
}

impl Histogram<()> {
	pub fn record(&self, value: f64) {
		self.inner.record(value, &[])
	}
}

impl<T1> Histogram<(T1,)>
where
	T1: MetricField,
{
	pub fn record(&self, value: f64, field1: T1) {
		let [k0] = &self.keys;
		self.inner
			.record(value, &[KeyValue::new(k0.clone(), field1.into_value())])
	}
}

#[macro_export]
macro_rules! metrics {
	(@meter_type $kind:ident (
		$metric_name:literal,
		$metric_description:literal
		$(,
			$((
				$($metric_label:literal : $metric_label_ty:ty),*$(,)?
			)$(,)?)?
		)?
	)) => {
		$crate::$kind<($($($($metric_label_ty,)*)?)?)>
	};

	(@meter_init $meter:ident $kind:ident (
		$metric_name:literal,
		$metric_description:literal
		$(,
			$((
				$($metric_label:literal : $metric_label_ty:ty),*$(,)?
			)$(,)?)?
		)?
	)) => {{
		$crate::$kind::new(
			&$meter,
			$metric_name,
			$metric_description,
			[
				$($($($metric_label,)*)?)?
			],
		)
	}};

	($vis:vis struct $struct_name:ident {
		$(
			$fld_vis:vis $name:ident : $kind:ident $factory:tt
		),*$(,)?
	}) => {
		$vis struct $struct_name {
			$(
				$fld_vis $name: $crate::metrics!(@meter_type $kind $factory),
			)*
		}

		impl $struct_name {
			pub fn from_meter(meter: $crate::_export::otel::Meter) -> Self {
				Self {
					$(
						$name: $crate::metrics!(@meter_init meter $kind $factory),
					)*
				}
			}

			pub fn new() -> Self {
				let scope = $crate::_export::InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
					.with_version(env!("CARGO_PKG_VERSION"))
					.build();

				Self::from_meter($crate::_export::meter_with_scope(scope))
			}

			pub fn global() -> &'static Self {
				static INSTANCE: $crate::_export::OnceCell<$struct_name> = $crate::_export::OnceCell::new();

				INSTANCE.get_or_init(Self::new)
			}
		}
	}
}

#[doc(hidden)]
pub mod _export {
	pub use once_cell::sync::OnceCell;
	pub use opentelemetry::InstrumentationScope;
	pub use opentelemetry::global::meter_with_scope;
	pub use opentelemetry::metrics as otel;
}
