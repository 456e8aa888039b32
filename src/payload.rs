use core::fmt::{self, Debug, Formatter};

/// A single submitted value.
#[derive(Clone, PartialEq, Eq)]
pub enum FieldValue {
	Text(String),
	/// File contents, sent byte-for-byte.
	File { file_name: String, content_type: String, bytes: Vec<u8> },
}

impl Debug for FieldValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Text(text) if cfg!(feature = "dangerous-logging") => f.debug_tuple("Text").field(text).finish(),
			FieldValue::Text(text) => write!(f, "Text(<{} bytes>)", text.len()),
			FieldValue::File { file_name, content_type, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("content_type", content_type)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}

impl From<String> for FieldValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<&str> for FieldValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

/// Field name to value, with unique names.
///
/// Insertion order is kept so request bodies are deterministic.
/// Inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<(String, FieldValue)>);

impl Payload {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
		let name = name.into();
		let value = value.into();
		match self.0.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, slot)) => Some(core::mem::replace(slot, value)),
			None => {
				self.0.push((name, value));
				None
			}
		}
	}

	/// Builder-style [`Payload::insert`].
	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert_file(&mut self, name: impl Into<String>, file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) {
		self.insert(
			name,
			FieldValue::File {
				file_name: file_name.into(),
				content_type: content_type.into(),
				bytes,
			},
		);
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.0.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
	}

	/// The value of `name` if it is a text field.
	#[must_use]
	pub fn text(&self, name: &str) -> Option<&str> {
		match self.get(name)? {
			FieldValue::Text(text) => Some(text),
			FieldValue::File { .. } => None,
		}
	}

	/// Name of the first file field, if any.
	#[must_use]
	pub fn first_file(&self) -> Option<&str> {
		self.0
			.iter()
			.find(|(_, value)| matches!(value, FieldValue::File { .. }))
			.map(|(name, _)| name.as_str())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value))
	}
}

impl<N: Into<String>, V: Into<FieldValue>> FromIterator<(N, V)> for Payload {
	fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
		let mut payload = Self::new();
		for (name, value) in iter {
			payload.insert(name, value);
		}
		payload
	}
}
