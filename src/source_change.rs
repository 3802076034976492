//! Trees of proposed source edits.
//!
//! Force-back and native functions don't apply edits directly; they build a
//! [`SourceChange`] describing the candidates. `And` children belong
//! together, `Or` children are alternatives of which the default apply
//! policy picks the first.

use crate::location::{Edit, Range};

/// A tree of candidate source edits.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceChange {
	/// One textual edit on the current source.
	Edit(Edit),
	/// All children must be applied together.
	And(Vec<SourceChange>),
	/// Exactly one child is applied; the leftmost under the default policy.
	Or(Vec<SourceChange>),
}

impl SourceChange {
	#[must_use]
	pub fn edit(range: Range, replacement: impl Into<String>) -> Self {
		Self::Edit(Edit { range, replacement: replacement.into() })
	}

	#[must_use]
	pub fn and(children: Vec<SourceChange>) -> Self {
		Self::And(children)
	}

	#[must_use]
	pub fn or(children: Vec<SourceChange>) -> Self {
		Self::Or(children)
	}

	/// And-combines two optional changes, the way evaluation results merge.
	#[must_use]
	pub fn merge(lhs: Option<SourceChange>, rhs: Option<SourceChange>) -> Option<SourceChange> {
		match (lhs, rhs) {
			(Some(lhs), Some(rhs)) => Some(Self::And(vec![lhs, rhs])),
			(Some(lhs), None) => Some(lhs),
			(None, rhs) => rhs,
		}
	}

	/// Structural cleanup: flattens nested groups of the same kind, drops
	/// empty groups, and unwraps single-child groups. Idempotent.
	#[must_use]
	pub fn normalize(self) -> Self {
		match self {
			Self::Edit(edit) => Self::Edit(edit),
			Self::And(children) => normalize_group(children, true),
			Self::Or(children) => normalize_group(children, false),
		}
	}

	/// Collapses the tree to the edit list the default policy applies: `And`
	/// concatenates, `Or` contributes only its first child.
	#[must_use]
	pub fn into_edits(self) -> Vec<Edit> {
		let mut edits = Vec::new();
		self.collect_edits(&mut edits);
		edits
	}

	fn collect_edits(self, edits: &mut Vec<Edit>) {
		match self {
			Self::Edit(edit) => edits.push(edit),
			Self::And(children) => {
				for child in children {
					child.collect_edits(edits);
				}
			}
			Self::Or(children) => {
				if let Some(first) = children.into_iter().next() {
					first.collect_edits(edits);
				}
			}
		}
	}
}

fn normalize_group(children: Vec<SourceChange>, is_and: bool) -> SourceChange {
	let mut flattened = Vec::with_capacity(children.len());

	for child in children {
		match child.normalize() {
			SourceChange::And(mut inner) if is_and => flattened.append(&mut inner),
			SourceChange::Or(mut inner) if !is_and => flattened.append(&mut inner),
			// empty groups normalize away entirely
			SourceChange::And(inner) if inner.is_empty() => {}
			SourceChange::Or(inner) if inner.is_empty() => {}
			child => flattened.push(child),
		}
	}

	if flattened.len() == 1 {
		return flattened.into_iter().next().expect("len checked");
	}

	if is_and {
		SourceChange::And(flattened)
	} else {
		SourceChange::Or(flattened)
	}
}
