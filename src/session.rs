//! The per-page state resent with every request.

use crate::{config::PageConfig, payload::Payload};
use serde_json::{Map, Value};
use tracing::{instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};

/// Security token and keep fields, embedded by the server when it rendered the page.
///
/// Constructed once at startup and then only read.
#[derive(Clone, Default, PartialEq)]
pub struct SessionContext {
	security_token: Option<String>,
	keep_fields: Map<String, Value>,
}

impl core::fmt::Debug for SessionContext {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			f.debug_struct("SessionContext")
				.field("security_token", &self.security_token)
				.field("keep_fields", &self.keep_fields)
				.finish()
		} else {
			f.debug_struct("SessionContext")
				.field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
				.field("keep_fields", &self.keep_fields.keys().collect::<Vec<_>>())
				.finish()
		}
	}
}

impl SessionContext {
	#[must_use]
	pub fn new(security_token: Option<String>, keep_fields: Map<String, Value>) -> Self {
		Self { security_token, keep_fields }
	}

	#[must_use]
	pub fn token(&self) -> Option<&str> {
		self.security_token.as_deref()
	}

	#[must_use]
	pub fn keep_fields(&self) -> &Map<String, Value> {
		&self.keep_fields
	}

	/// The keep fields in their wire form, a JSON object.
	#[must_use]
	pub fn keep_fields_json(&self) -> String {
		Value::Object(self.keep_fields.clone()).to_string()
	}

	/// Merges the token (if any) and keep fields into `payload`, replacing stale values.
	pub fn stamp(&self, payload: &mut Payload, config: &PageConfig) {
		if let Some(token) = &self.security_token {
			payload.insert(config.token_field.as_str(), token.as_str());
		}
		payload.insert(config.keep_field.as_str(), self.keep_fields_json());
	}

	/// Reads the page globals named in `config`, falling back to the token cookie.
	///
	/// Nothing beyond presence is validated.
	/// Without a token, requests are sent without one and the server decides.
	#[instrument(skip(window, config))]
	pub fn from_window(window: &web_sys::Window, config: &PageConfig) -> Self {
		let global = |name: &str| js_sys::Reflect::get(window, &JsValue::from_str(name)).ok().filter(|value| !value.is_undefined() && !value.is_null());

		let security_token = global(&config.token_global)
			.and_then(|token| token.as_string())
			.or_else(|| {
				let cookies = window.document()?.dyn_into::<web_sys::HtmlDocument>().ok()?.cookie().ok()?;
				let raw = cookie_value(&cookies, &config.token_cookie)?;
				js_sys::decode_uri_component(raw).ok().map(String::from)
			});
		if security_token.is_none() {
			warn!("No security token found in `window.{}` or the {:?} cookie.", config.token_global, config.token_cookie);
		}

		let keep_fields = match global(&config.keep_global) {
			None => Map::new(),
			Some(value) => {
				let text = match value.as_string() {
					Some(text) => Some(text),
					None => js_sys::JSON::stringify(&value).ok().map(String::from),
				};
				text.as_deref().map_or_else(Map::new, parse_keep_fields)
			}
		};

		let session = Self::new(security_token, keep_fields);
		trace!(?session, "Loaded session context.");
		session
	}
}

/// Parses serialized keep fields. Anything but a JSON object is discarded.
#[must_use]
pub fn parse_keep_fields(text: &str) -> Map<String, Value> {
	match serde_json::from_str(text) {
		Ok(Value::Object(map)) => map,
		Ok(other) => {
			warn!("Keep fields are not a JSON object but {}; ignoring them.", kind(&other));
			Map::new()
		}
		Err(error) => {
			warn!("Keep fields are not valid JSON ({}); ignoring them.", error);
			Map::new()
		}
	}
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

/// Finds the still-encoded value of cookie `name` in a `document.cookie` string.
#[must_use]
pub fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
	cookies
		.split(';')
		.map(str::trim)
		.find_map(|cookie| cookie.strip_prefix(name)?.strip_prefix('='))
}
