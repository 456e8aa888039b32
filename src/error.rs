//! Failure taxonomy of the request/response cycle.
//!
//! Each layer has its own error type. [`DispatchError`] composes them for callers of
//! [`AsyncPage::dispatch`](`crate::page::AsyncPage::dispatch`) and
//! [`AsyncPage::submit_form`](`crate::page::AsyncPage::submit_form`).

use thiserror::Error;
use wasm_bindgen::JsValue;

/// The request never produced a successful HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("network failure: {0}")]
	Network(String),
	#[error("server responded with HTTP status {status}")]
	Status { status: u16, body: String },
}

/// The response arrived but doesn't carry update instructions.
#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("malformed response body: {0}")]
	Malformed(String),
	#[error("response body has no update instructions")]
	MissingInstructions,
}

/// A failed DOM primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	#[error("DOM operation failed: {0}")]
	Js(String),
	#[error("invalid selector {0:?}")]
	Selector(String),
}

impl From<JsValue> for DomError {
	fn from(value: JsValue) -> Self {
		Self::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
	}
}

/// Update instructions could not be executed.
///
/// Operations that ran before the failing one stay applied.
#[derive(Debug, Error)]
pub enum ApplyError {
	#[error("invalid update program: {0}")]
	Program(String),
	#[error("no element matches {selector:?}")]
	NoMatch { selector: String },
	#[error(transparent)]
	Dom(#[from] DomError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	#[error(transparent)]
	Apply(#[from] ApplyError),
	#[error(transparent)]
	Dom(#[from] DomError),
	#[error("file field {field:?} can only be sent by a form submission")]
	FileInAction { field: String },
}

impl From<DispatchError> for JsValue {
	fn from(error: DispatchError) -> Self {
		JsValue::from_str(&error.to_string())
	}
}
