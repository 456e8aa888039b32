/// Where requests are posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
	/// The document's current URL, so the view that rendered the page also handles its actions.
	CurrentPage,
	Fixed(String),
}

/// Names and policies shared by the dispatcher, the binder and bootstrap.
///
/// The defaults match what the server-side page handler renders and expects.
#[derive(Debug, Clone)]
pub struct PageConfig {
	pub endpoint: Endpoint,
	/// Whether bound forms also receive the security token as a hidden input.
	///
	/// The dispatcher stamps the token onto every request regardless.
	pub hidden_token_field: bool,

	pub async_marker: String,
	pub autofocus_attribute: String,
	pub row_selector: String,
	pub row_href_attribute: String,
	pub modal_selector: String,
	pub modal_shown_event: String,

	pub action_field: String,
	pub token_field: String,
	pub keep_field: String,

	pub token_global: String,
	pub keep_global: String,
	pub token_cookie: String,
}

impl Default for PageConfig {
	fn default() -> Self {
		Self {
			endpoint: Endpoint::CurrentPage,
			hidden_token_field: true,

			async_marker: "data-async".to_owned(),
			autofocus_attribute: "data-autofocus".to_owned(),
			row_selector: ".table tr[data-href]".to_owned(),
			row_href_attribute: "data-href".to_owned(),
			modal_selector: ".modal".to_owned(),
			modal_shown_event: "shown.bs.modal".to_owned(),

			action_field: "action".to_owned(),
			token_field: "csrfmiddlewaretoken".to_owned(),
			keep_field: "keep_variables".to_owned(),

			token_global: "csrf_token".to_owned(),
			keep_global: "keep_variables".to_owned(),
			token_cookie: "csrftoken".to_owned(),
		}
	}
}

impl PageConfig {
	#[must_use]
	pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
		self.endpoint = endpoint;
		self
	}

	#[must_use]
	pub fn with_hidden_token_field(mut self, hidden_token_field: bool) -> Self {
		self.hidden_token_field = hidden_token_field;
		self
	}

	#[must_use]
	pub fn with_async_marker(mut self, async_marker: impl Into<String>) -> Self {
		self.async_marker = async_marker.into();
		self
	}

	/// Selects the forms that still need to be bound.
	#[must_use]
	pub fn async_form_selector(&self) -> String {
		format!("form[{}]", self.async_marker)
	}

	#[must_use]
	pub fn autofocus_selector(&self) -> String {
		format!("[{}]", self.autofocus_attribute)
	}
}
