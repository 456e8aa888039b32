use crate::{
	error::DispatchError,
	payload::{FieldValue, Payload},
};
use url::form_urlencoded;

/// How the request body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	/// `application/x-www-form-urlencoded`
	UrlEncoded,
	/// `multipart/form-data`, so file contents pass through unmodified.
	Multipart,
}

/// A fully stamped request, ready for a [`Transport`](`crate::transport::Transport`).
///
/// Always a `POST` expecting a JSON response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
	pub url: String,
	pub payload: Payload,
	pub encoding: Encoding,
}

pub const URL_ENCODED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

impl ActionRequest {
	/// A request for an explicit action, which is always URL-encoded.
	///
	/// # Errors
	///
	/// Iff `payload` contains a file field.
	pub fn for_action(url: String, payload: Payload) -> Result<Self, DispatchError> {
		if let Some(field) = payload.first_file() {
			return Err(DispatchError::FileInAction { field: field.to_owned() });
		}
		Ok(Self {
			url,
			payload,
			encoding: Encoding::UrlEncoded,
		})
	}

	/// A request for a submitted form. Forms with file fields are sent as multipart.
	#[must_use]
	pub fn for_form(url: String, payload: Payload, has_file_field: bool) -> Self {
		let encoding = if has_file_field || payload.first_file().is_some() {
			Encoding::Multipart
		} else {
			Encoding::UrlEncoded
		};
		Self { url, payload, encoding }
	}

	/// The body for [`Encoding::UrlEncoded`] requests.
	///
	/// Returns [`None`] for multipart requests, which the transport assembles itself.
	#[must_use]
	pub fn url_encoded_body(&self) -> Option<String> {
		if self.encoding != Encoding::UrlEncoded {
			return None;
		}
		let mut serializer = form_urlencoded::Serializer::new(String::new());
		for (name, value) in self.payload.iter() {
			match value {
				FieldValue::Text(text) => serializer.append_pair(name, text),
				FieldValue::File { .. } => return None,
			};
		}
		Some(serializer.finish())
	}
}
