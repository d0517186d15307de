//! Whole-tree constraint validation.
//!
//! A [`Validate`] impl declares its constraints by walking its own fields
//! through a [`ValidationContext`]. Every failing constraint is recorded; nothing
//! short-circuits, so one pass reports every problem in the configuration.
//!
//! ```ignore
//! impl Validate for HttpConnectorFactory {
//!     fn validate(&self, ctx: &mut ValidationContext<'_>) {
//!         ctx.field("port", &self.port).check(&Range::new(1, 65535));
//!         ctx.field("bindHost", &self.bind_host).check(&NotEmpty);
//!     }
//! }
//! ```

use std::borrow::Cow;
use std::fmt;

mod constraints;

pub use constraints::{Length, Max, Min, NotEmpty, NotNull, OneOf, Pattern, Range, Size};

/// A predicate over a field value.
pub trait Constraint<T: ?Sized> {
	fn is_valid(&self, value: &T) -> bool;

	/// Reported next to the property path, e.g. `must be between 1 and 65535`.
	fn message(&self) -> Cow<'_, str>;
}

/// Types whose values can be checked against declared constraints.
pub trait Validate {
	fn validate(&self, ctx: &mut ValidationContext<'_>);
}

/// Renders an offending value for a violation report.
///
/// Strings are not quoted and numbers use their plain `Display` form.
pub trait ReportValue {
	fn report(&self) -> String;
}

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
	pub path: String,
	pub message: String,
	pub value: String,
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} (was {})", self.path, self.message, self.value)
	}
}

/// Validates `value` and returns every violation, sorted by property path.
///
/// The sort is stable, so violations on the same path keep the order their
/// constraints were declared in.
pub fn validate<T: Validate + ?Sized>(value: &T) -> Vec<Violation> {
	let mut violations = Vec::new();
	value.validate(&mut ValidationContext {
		path: String::new(),
		violations: &mut violations,
	});
	violations.sort_by(|a, b| a.path.cmp(&b.path));
	violations
}

/// Accumulates violations under a property path prefix.
pub struct ValidationContext<'a> {
	path: String,
	violations: &'a mut Vec<Violation>,
}

impl<'a> ValidationContext<'a> {
	/// Property path of the value being validated. Empty at the root.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Starts checking the field `name`.
	#[must_use = "a field check does nothing until constraints are chained onto it"]
	pub fn field<'c, T: ReportValue + ?Sized>(&'c mut self, name: &'c str, value: &'c T) -> FieldCheck<'c, 'a, T> {
		FieldCheck { ctx: self, name, value }
	}

	/// Validates a nested value under `name`.
	pub fn nested<T: Validate + ?Sized>(&mut self, name: &str, value: &T) {
		let path = self.child_path(name);
		value.validate(&mut self.child(path));
	}

	/// Validates each element under `name[i]`.
	pub fn each<'v, T: Validate + ?Sized + 'v>(&mut self, name: &str, values: impl IntoIterator<Item = &'v T>) {
		let base = self.child_path(name);
		for (index, value) in values.into_iter().enumerate() {
			value.validate(&mut self.child(format!("{base}[{index}]")));
		}
	}

	/// Validates an element of the collection being validated.
	pub fn index<T: Validate + ?Sized>(&mut self, index: usize, value: &T) {
		let path = format!("{}[{index}]", self.path);
		value.validate(&mut self.child(path));
	}

	/// Records a violation found by hand, e.g. a check spanning two fields.
	pub fn violation(&mut self, name: &str, message: impl Into<String>, value: &(impl ReportValue + ?Sized)) {
		let path = self.child_path(name);
		self.record(path, message.into(), value.report());
	}

	fn record(&mut self, path: String, message: String, value: String) {
		tracing::trace!(path = %path, message = %message, "constraint violated");
		self.violations.push(Violation { path, message, value });
	}

	fn child_path(&self, name: &str) -> String {
		match (self.path.is_empty(), name.is_empty()) {
			(true, _) => name.to_string(),
			(false, true) => self.path.clone(),
			(false, false) => format!("{}.{name}", self.path),
		}
	}

	fn child(&mut self, path: String) -> ValidationContext<'_> {
		ValidationContext {
			path,
			violations: &mut *self.violations,
		}
	}
}

impl fmt::Debug for ValidationContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValidationContext")
			.field("path", &self.path)
			.field("violations", &self.violations.len())
			.finish()
	}
}

/// Constraint checks on one field, evaluated in the order they are chained.
pub struct FieldCheck<'c, 'a, T: ?Sized> {
	ctx: &'c mut ValidationContext<'a>,
	name: &'c str,
	value: &'c T,
}

impl<T: ReportValue + ?Sized> FieldCheck<'_, '_, T> {
	pub fn check<C: Constraint<T> + ?Sized>(mut self, constraint: &C) -> Self {
		if !constraint.is_valid(self.value) {
			let path = self.ctx.child_path(self.name);
			self.ctx.record(path, constraint.message().into_owned(), self.value.report());
		}
		self
	}
}

impl<T: Validate + ?Sized> Validate for Box<T> {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		(**self).validate(ctx);
	}
}

impl<T: Validate> Validate for Option<T> {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		if let Some(value) = self {
			value.validate(ctx);
		}
	}
}

impl<T: Validate> Validate for [T] {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		for (index, value) in self.iter().enumerate() {
			ctx.index(index, value);
		}
	}
}

impl<T: Validate> Validate for Vec<T> {
	fn validate(&self, ctx: &mut ValidationContext<'_>) {
		self.as_slice().validate(ctx);
	}
}

impl<T: ReportValue + ?Sized> ReportValue for &T {
	fn report(&self) -> String {
		(**self).report()
	}
}

impl ReportValue for str {
	fn report(&self) -> String {
		self.to_string()
	}
}

macro_rules! display_report_value {
	($($ty:ty),+ $(,)?) => {
		$(
			impl ReportValue for $ty {
				fn report(&self) -> String {
					self.to_string()
				}
			}
		)+
	};
}

display_report_value!(String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ReportValue for std::path::Path {
	fn report(&self) -> String {
		self.display().to_string()
	}
}

impl ReportValue for std::path::PathBuf {
	fn report(&self) -> String {
		self.as_path().report()
	}
}

impl<T: ReportValue> ReportValue for Option<T> {
	fn report(&self) -> String {
		self.as_ref().map_or_else(|| "null".to_string(), ReportValue::report)
	}
}

impl<T: ReportValue + ?Sized> ReportValue for Box<T> {
	fn report(&self) -> String {
		(**self).report()
	}
}

impl<T: ReportValue> ReportValue for [T] {
	fn report(&self) -> String {
		let items: Vec<_> = self.iter().map(ReportValue::report).collect();
		format!("[{}]", items.join(", "))
	}
}

impl<T: ReportValue> ReportValue for Vec<T> {
	fn report(&self) -> String {
		self.as_slice().report()
	}
}
