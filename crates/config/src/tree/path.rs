//! Property path tracking for mapping diagnostics.
//!
//! The deserializer pushes a segment before descending into a mapping value or
//! sequence element and pops it on the way out, so any error constructed during
//! that descent can record where it happened.

use std::cell::RefCell;
use std::fmt::Write;

#[derive(Debug, Clone)]
enum Segment {
	Key(String),
	Index(usize),
}

thread_local! {
	static PATH: RefCell<Vec<Segment>> = const { RefCell::new(Vec::new()) };
}

/// Pops its segment when dropped, including during unwinding.
pub(crate) struct PathGuard(());

impl PathGuard {
	pub(crate) fn key(key: &str) -> Self {
		PATH.with_borrow_mut(|path| path.push(Segment::Key(key.to_string())));
		PathGuard(())
	}

	pub(crate) fn index(index: usize) -> Self {
		PATH.with_borrow_mut(|path| path.push(Segment::Index(index)));
		PathGuard(())
	}
}

impl Drop for PathGuard {
	fn drop(&mut self) {
		PATH.with_borrow_mut(|path| {
			path.pop();
		});
	}
}

/// Saves the current path and starts an empty one, restoring on drop.
///
/// Used at the entry of a top-level mapping so an unrelated mapping already in
/// progress on this thread does not leak its prefix.
pub(crate) struct PathFrame(Vec<Segment>);

impl PathFrame {
	pub(crate) fn fresh() -> Self {
		PathFrame(PATH.with_borrow_mut(std::mem::take))
	}
}

impl Drop for PathFrame {
	fn drop(&mut self) {
		let saved = std::mem::take(&mut self.0);
		PATH.with_borrow_mut(|path| *path = saved);
	}
}

/// Renders the current path, e.g. `server.connectors[1].port`.
pub(crate) fn current() -> String {
	PATH.with_borrow(|path| render(path.iter()))
}

/// Renders the current path with one more key appended.
pub(crate) fn child(key: &str) -> String {
	PATH.with_borrow(|path| render(path.iter().chain(std::iter::once(&Segment::Key(key.to_string())))))
}

fn render<'a>(segments: impl Iterator<Item = &'a Segment>) -> String {
	let mut out = String::new();
	for segment in segments {
		match segment {
			Segment::Key(key) => {
				if !out.is_empty() {
					out.push('.');
				}
				out.push_str(key);
			}
			Segment::Index(index) => {
				let _ = write!(out, "[{index}]");
			}
		}
	}
	out
}
