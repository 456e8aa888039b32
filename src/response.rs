use crate::error::ProtocolError;
use serde::Deserialize;
use serde_json::Value;

/// The JSON body the server answers every action with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerResponse {
	/// Update instructions, as parsed by [`UpdateProgram`](`crate::update::UpdateProgram`).
	#[serde(rename = "javascript")]
	pub instructions: String,
	#[serde(default)]
	pub html: Option<String>,
	#[serde(default)]
	pub data: Value,
}

impl ServerResponse {
	/// # Errors
	///
	/// [`ProtocolError::MissingInstructions`] iff `body` is a JSON object without a string `javascript` field,
	/// [`ProtocolError::Malformed`] for anything else that doesn't fit.
	pub fn parse(body: &str) -> Result<Self, ProtocolError> {
		let value: Value = serde_json::from_str(body).map_err(|error| ProtocolError::Malformed(error.to_string()))?;
		match value.get("javascript") {
			Some(Value::String(_)) => (),
			_ if value.is_object() => return Err(ProtocolError::MissingInstructions),
			_ => return Err(ProtocolError::Malformed("expected a JSON object".to_owned())),
		}
		serde_json::from_value(value).map_err(|error| ProtocolError::Malformed(error.to_string()))
	}
}

/// What a successful action hands back to its caller, besides the applied update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
	pub html: Option<String>,
	pub data: Value,
}

impl From<ServerResponse> for ActionOutcome {
	fn from(response: ServerResponse) -> Self {
		Self {
			html: response.html,
			data: response.data,
		}
	}
}
