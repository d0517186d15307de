//! The registry in effect for mappings running on the current thread.
//!
//! `serde` gives `Deserialize` impls no way to receive context, so the
//! [`TypeMapper`](super::TypeMapper) installs its registry here for the duration
//! of a mapping and polymorphic fields read it back.

use std::cell::RefCell;
use std::sync::Arc;

use crate::registry::SubtypeRegistry;
use crate::tree::MappingError;

struct Scope {
	registry: Arc<SubtypeRegistry>,
	deferred: Option<MappingError>,
}

thread_local! {
	static ACTIVE: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

/// Restores the previously active scope when dropped.
pub(crate) struct ScopeGuard {
	previous: Option<Scope>,
}

pub(crate) fn enter(registry: Arc<SubtypeRegistry>) -> ScopeGuard {
	let scope = Scope { registry, deferred: None };
	ScopeGuard {
		previous: ACTIVE.with_borrow_mut(|active| active.replace(scope)),
	}
}

impl ScopeGuard {
	/// Takes the structured error recorded by a failed polymorphic field when it
	/// is the failure that ended the mapping.
	///
	/// A recorded error whose cause differs from `failure` belongs to a field
	/// serde recovered from (an untagged enum trying its next variant), so it is
	/// discarded.
	pub(crate) fn take_deferred(&self, failure: &MappingError) -> Option<MappingError> {
		ACTIVE.with_borrow_mut(|active| active.as_mut().and_then(|scope| scope.deferred.take()))
			.filter(|deferred| deferred.cause() == failure.cause())
	}
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		let previous = self.previous.take();
		ACTIVE.with_borrow_mut(|active| *active = previous);
	}
}

/// The registry of the innermost active scope.
pub(crate) fn registry() -> Option<Arc<SubtypeRegistry>> {
	ACTIVE.with_borrow(|active| active.as_ref().map(|scope| Arc::clone(&scope.registry)))
}

/// Records a structured failure so it survives conversion into a foreign
/// deserializer's error type.
///
/// An enclosing polymorphic field re-reports a nested failure with the same
/// cause at a shorter path. The deeper record is kept in that case.
pub(crate) fn defer(error: MappingError) {
	ACTIVE.with_borrow_mut(|active| {
		let Some(scope) = active.as_mut() else {
			return;
		};
		let nested = scope
			.deferred
			.as_ref()
			.is_some_and(|deferred| deferred.cause() == error.cause() && deferred.path().starts_with(error.path()));
		if !nested {
			scope.deferred = Some(error);
		}
	});
}

/// Forgets any recorded failure. Called once a polymorphic field maps, since
/// anything recorded before it was recovered from.
pub(crate) fn clear_deferred() {
	ACTIVE.with_borrow_mut(|active| {
		if let Some(scope) = active.as_mut() {
			scope.deferred = None;
		}
	});
}
