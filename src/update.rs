//! Server-authored document updates.
//!
//! The server describes its patch as a JSON array drawn from a closed set of operations.
//! Nothing in it is ever executed as code: [`apply_program`] interprets each operation through [`Dom`].

use crate::{
	dom::{Dom, InsertPosition},
	error::ApplyError,
};
use core::str::FromStr;
use serde::Deserialize;
use tracing::{instrument, trace, trace_span};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum UpdateOperation {
	/// Replaces the children of every `target` match.
	ReplaceContent { target: String, html: String },
	/// Replaces every `target` match itself.
	ReplaceElement { target: String, html: String },
	Insert { target: String, position: InsertPosition, html: String },
	Remove { target: String },
	SetAttribute { target: String, name: String, value: String },
	RemoveAttribute { target: String, name: String },
	/// Leaves the page. Later operations still run, but won't be visible for long.
	Navigate { url: String },
}

/// A parsed list of [`UpdateOperation`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProgram(pub Vec<UpdateOperation>);

impl FromStr for UpdateProgram {
	type Err = ApplyError;

	/// Parses the whole program up front, so that a malformed one changes nothing.
	///
	/// Blank text is the empty program.
	fn from_str(text: &str) -> Result<Self, Self::Err> {
		if text.trim().is_empty() {
			return Ok(Self::default());
		}
		serde_json::from_str(text).map(Self).map_err(|error| ApplyError::Program(error.to_string()))
	}
}

impl UpdateProgram {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}
}

/// Runs `program` against `dom` in order.
///
/// # Errors
///
/// Stops at the first failing operation. Earlier operations stay applied.
#[instrument(skip(dom, program), fields(operations = program.len()))]
pub fn apply_program<D: Dom>(dom: &D, program: &UpdateProgram) -> Result<(), ApplyError> {
	for (i, operation) in program.0.iter().enumerate() {
		let span = trace_span!("operation", i, ?operation);
		let _enter = span.enter();
		apply_operation(dom, operation)?;
	}
	Ok(())
}

fn apply_operation<D: Dom>(dom: &D, operation: &UpdateOperation) -> Result<(), ApplyError> {
	match operation {
		UpdateOperation::ReplaceContent { target, html } => {
			for element in matches(dom, target)? {
				dom.set_inner_html(&element, html)?;
			}
		}
		UpdateOperation::ReplaceElement { target, html } => {
			for element in matches(dom, target)? {
				dom.set_outer_html(&element, html)?;
			}
		}
		UpdateOperation::Insert { target, position, html } => {
			for element in matches(dom, target)? {
				dom.insert_html(&element, *position, html)?;
			}
		}
		UpdateOperation::Remove { target } => {
			for element in matches(dom, target)? {
				dom.remove(&element)?;
			}
		}
		UpdateOperation::SetAttribute { target, name, value } => {
			for element in matches(dom, target)? {
				dom.set_attribute(&element, name, value)?;
			}
		}
		UpdateOperation::RemoveAttribute { target, name } => {
			for element in matches(dom, target)? {
				dom.remove_attribute(&element, name)?;
			}
		}
		UpdateOperation::Navigate { url } => dom.navigate(url)?,
	}
	Ok(())
}

fn matches<D: Dom>(dom: &D, selector: &str) -> Result<Vec<D::Element>, ApplyError> {
	let elements = dom.query_all(selector)?;
	if elements.is_empty() {
		return Err(ApplyError::NoMatch { selector: selector.to_owned() });
	}
	trace!("{} match(es) for {:?}.", elements.len(), selector);
	Ok(elements)
}
