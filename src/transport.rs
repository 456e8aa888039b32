use crate::{error::TransportError, request::ActionRequest};
use async_trait::async_trait;

/// A received HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
	pub status: u16,
	pub body: String,
}

impl TransportResponse {
	#[must_use]
	pub fn ok(body: impl Into<String>) -> Self {
		Self { status: 200, body: body.into() }
	}

	#[must_use]
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Sends [`ActionRequest`]s.
///
/// Everything runs on the page's single thread, so futures don't need to be [`Send`].
/// No timeouts or retries are applied on top of what an implementation does by itself.
#[async_trait(?Send)]
pub trait Transport {
	/// Sends `request` once.
	///
	/// # Errors
	///
	/// [`TransportError::Network`] iff no response was received.
	/// Non-success statuses are returned as [`Ok`] and checked by the caller.
	async fn send(&self, request: ActionRequest) -> Result<TransportResponse, TransportError>;
}
