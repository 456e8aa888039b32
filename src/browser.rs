//! [`Transport`] over the browser's `fetch`.

use crate::{
	error::TransportError,
	payload::FieldValue,
	request::{ActionRequest, Encoding, URL_ENCODED_CONTENT_TYPE},
	transport::{Transport, TransportResponse},
};
use async_trait::async_trait;
use gloo_net::http::Request;
use tracing::{instrument, trace};
use wasm_bindgen::JsValue;

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTransport;

impl BrowserTransport {
	fn form_data(request: &ActionRequest) -> Result<web_sys::FormData, JsValue> {
		let form_data = web_sys::FormData::new()?;
		for (name, value) in request.payload.iter() {
			match value {
				FieldValue::Text(text) => form_data.append_with_str(name, text)?,
				FieldValue::File { file_name, content_type, bytes } => {
					let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
					let options = web_sys::BlobPropertyBag::new();
					options.set_type(content_type);
					let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
					form_data.append_with_blob_and_filename(name, &blob, file_name)?;
				}
			}
		}
		Ok(form_data)
	}
}

#[async_trait(?Send)]
impl Transport for BrowserTransport {
	#[instrument(skip(request), fields(url = %request.url, encoding = ?request.encoding, fields = request.payload.len()))]
	async fn send(&self, request: ActionRequest) -> Result<TransportResponse, TransportError> {
		let js_error = |error: JsValue| TransportError::Network(format!("{:?}", error));

		let builder = Request::post(&request.url)
			.header("Accept", "application/json")
			.header("X-Requested-With", "XMLHttpRequest");
		let built = match request.encoding {
			Encoding::UrlEncoded => {
				let body = request.url_encoded_body().unwrap_or_default();
				builder.header("Content-Type", URL_ENCODED_CONTENT_TYPE).body(body)
			}
			// The browser picks the multipart boundary and content type.
			Encoding::Multipart => builder.body(Self::form_data(&request).map_err(js_error)?),
		};
		let built = built.map_err(|error| TransportError::Network(error.to_string()))?;

		let response = built.send().await.map_err(|error| TransportError::Network(error.to_string()))?;
		let status = response.status();
		let body = response.text().await.map_err(|error| TransportError::Network(error.to_string()))?;
		trace!(status, body_len = body.len(), "Received response.");
		Ok(TransportResponse { status, body })
	}
}
