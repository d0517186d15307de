//! Built-in constraints.
//!
//! Absent optional values pass every constraint except [`NotNull`] and
//! [`NotEmpty`], so `Option<T>` fields can be constrained without first
//! requiring them.

use std::borrow::Cow;
use std::fmt::{self, Display};

use regex::Regex;

use super::Constraint;

/// Fails on `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNull;

impl<T> Constraint<Option<T>> for NotNull {
	fn is_valid(&self, value: &Option<T>) -> bool {
		value.is_some()
	}

	fn message(&self) -> Cow<'_, str> {
		Cow::Borrowed("may not be null")
	}
}

/// Values that have a length, for [`NotEmpty`] and [`Size`].
pub trait Length {
	fn length(&self) -> usize;
}

impl Length for str {
	fn length(&self) -> usize {
		self.chars().count()
	}
}

impl Length for String {
	fn length(&self) -> usize {
		self.as_str().length()
	}
}

impl<T> Length for [T] {
	fn length(&self) -> usize {
		self.len()
	}
}

impl<T> Length for Vec<T> {
	fn length(&self) -> usize {
		self.len()
	}
}

impl<K, V, S> Length for indexmap::IndexMap<K, V, S> {
	fn length(&self) -> usize {
		self.len()
	}
}

impl<T: Length> Length for Option<T> {
	fn length(&self) -> usize {
		self.as_ref().map_or(0, Length::length)
	}
}

/// Fails on empty strings and collections, and on `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmpty;

impl<T: Length + ?Sized> Constraint<T> for NotEmpty {
	fn is_valid(&self, value: &T) -> bool {
		value.length() > 0
	}

	fn message(&self) -> Cow<'_, str> {
		Cow::Borrowed("may not be empty")
	}
}

/// Length between `min` and `max`, inclusive.
#[derive(Debug, Clone, Copy)]
pub struct Size {
	pub min: usize,
	pub max: usize,
}

impl Size {
	pub fn new(min: usize, max: usize) -> Self {
		Self { min, max }
	}
}

impl<T: Length + ?Sized> Constraint<T> for Size {
	fn is_valid(&self, value: &T) -> bool {
		(self.min..=self.max).contains(&value.length())
	}

	fn message(&self) -> Cow<'_, str> {
		Cow::Owned(format!("size must be between {} and {}", self.min, self.max))
	}
}

/// The whole value must match a regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
	source: String,
	regex: Regex,
}

impl Pattern {
	pub fn new(pattern: &str) -> Result<Self, regex::Error> {
		Ok(Self {
			source: pattern.to_string(),
			regex: Regex::new(&format!("^(?:{pattern})$"))?,
		})
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}
}

impl Constraint<str> for Pattern {
	fn is_valid(&self, value: &str) -> bool {
		self.regex.is_match(value)
	}

	fn message(&self) -> Cow<'_, str> {
		Cow::Owned(format!("must match \"{}\"", self.source))
	}
}

impl Constraint<String> for Pattern {
	fn is_valid(&self, value: &String) -> bool {
		self.regex.is_match(value)
	}

	fn message(&self) -> Cow<'_, str> {
		Constraint::<str>::message(self)
	}
}

impl Constraint<Option<String>> for Pattern {
	fn is_valid(&self, value: &Option<String>) -> bool {
		value.as_deref().is_none_or(|value| self.regex.is_match(value))
	}

	fn message(&self) -> Cow<'_, str> {
		Constraint::<str>::message(self)
	}
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy)]
pub struct Range<T> {
	pub min: T,
	pub max: T,
}

impl<T> Range<T> {
	pub fn new(min: T, max: T) -> Self {
		Self { min, max }
	}
}

/// Inclusive lower bound.
#[derive(Debug, Clone, Copy)]
pub struct Min<T>(pub T);

/// Inclusive upper bound.
#[derive(Debug, Clone, Copy)]
pub struct Max<T>(pub T);

macro_rules! bound_constraint {
	($name:ident<$t:ident>, |$this:ident, $value:ident| $valid:expr, |$me:ident| $message:expr) => {
		impl<$t: PartialOrd + Display> Constraint<$t> for $name<$t> {
			fn is_valid(&self, value: &$t) -> bool {
				let $this = self;
				let $value = value;
				$valid
			}

			fn message(&self) -> Cow<'_, str> {
				let $me = self;
				Cow::Owned($message)
			}
		}

		impl<$t: PartialOrd + Display> Constraint<Option<$t>> for $name<$t> {
			fn is_valid(&self, value: &Option<$t>) -> bool {
				value.as_ref().is_none_or(|value| Constraint::<$t>::is_valid(self, value))
			}

			fn message(&self) -> Cow<'_, str> {
				Constraint::<$t>::message(self)
			}
		}
	};
}

bound_constraint!(
	Range<T>,
	|this, value| *value >= this.min && *value <= this.max,
	|this| format!("must be between {} and {}", this.min, this.max)
);
bound_constraint!(
	Min<T>,
	|this, value| *value >= this.0,
	|this| format!("must be greater than or equal to {}", this.0)
);
bound_constraint!(
	Max<T>,
	|this, value| *value <= this.0,
	|this| format!("must be less than or equal to {}", this.0)
);

/// Value must be one of a fixed set of strings.
#[derive(Debug, Clone)]
pub struct OneOf {
	allowed: Vec<String>,
	ignore_case: bool,
}

impl OneOf {
	pub fn new<S: Into<String>>(allowed: impl IntoIterator<Item = S>) -> Self {
		Self {
			allowed: allowed.into_iter().map(Into::into).collect(),
			ignore_case: false,
		}
	}

	pub fn ignore_case(mut self) -> Self {
		self.ignore_case = true;
		self
	}

	fn accepts(&self, value: &str) -> bool {
		self.allowed.iter().any(|allowed| {
			if self.ignore_case {
				allowed.eq_ignore_ascii_case(value)
			} else {
				allowed == value
			}
		})
	}
}

impl fmt::Display for OneOf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", self.allowed.join(", "))
	}
}

impl Constraint<str> for OneOf {
	fn is_valid(&self, value: &str) -> bool {
		self.accepts(value)
	}

	fn message(&self) -> Cow<'_, str> {
		Cow::Owned(format!("must be one of {self}"))
	}
}

impl Constraint<String> for OneOf {
	fn is_valid(&self, value: &String) -> bool {
		self.accepts(value)
	}

	fn message(&self) -> Cow<'_, str> {
		Constraint::<str>::message(self)
	}
}

impl Constraint<Option<String>> for OneOf {
	fn is_valid(&self, value: &Option<String>) -> bool {
		value.as_deref().is_none_or(|value| self.accepts(value))
	}

	fn message(&self) -> Cow<'_, str> {
		Constraint::<str>::message(self)
	}
}
