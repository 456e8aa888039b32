//! The document primitives the binding layer is written against.
//!
//! [`WebDom`](`crate::web::WebDom`) implements them over `web-sys`.

use crate::{error::DomError, payload::Payload};
use async_trait::async_trait;
use core::fmt::Debug;
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use std::rc::Rc;

/// Stable identity of one element instance for as long as it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub u32);

/// Where markup is inserted relative to a target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
	BeforeBegin,
	AfterBegin,
	BeforeEnd,
	AfterEnd,
}

impl InsertPosition {
	/// The name `insertAdjacentHTML` expects.
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			InsertPosition::BeforeBegin => "beforebegin",
			InsertPosition::AfterBegin => "afterbegin",
			InsertPosition::BeforeEnd => "beforeend",
			InsertPosition::AfterEnd => "afterend",
		}
	}
}

pub type Handler = Rc<dyn Fn()>;

#[async_trait(?Send)]
pub trait Dom {
	type Element: Clone + Debug + 'static;

	/// All matches of `selector` in document order.
	fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError>;
	/// The first match of `selector` among `scope`'s descendants.
	fn query_first_within(&self, scope: &Self::Element, selector: &str) -> Result<Option<Self::Element>, DomError>;

	fn key(&self, element: &Self::Element) -> ElementKey;
	fn is_connected(&self, element: &Self::Element) -> bool;

	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
	fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<(), DomError>;
	fn remove_attribute(&self, element: &Self::Element, name: &str) -> Result<(), DomError>;
	fn set_style(&self, element: &Self::Element, property: &str, value: &str) -> Result<(), DomError>;

	fn inner_html(&self, element: &Self::Element) -> String;
	fn set_inner_html(&self, element: &Self::Element, html: &str) -> Result<(), DomError>;
	fn set_outer_html(&self, element: &Self::Element, html: &str) -> Result<(), DomError>;
	fn insert_html(&self, element: &Self::Element, position: InsertPosition, html: &str) -> Result<(), DomError>;
	fn remove(&self, element: &Self::Element) -> Result<(), DomError>;

	/// Sets the value of `form`'s hidden input called `name`, appending the input if there is none.
	fn upsert_hidden_input(&self, form: &Self::Element, name: &str, value: &str) -> Result<(), DomError>;
	fn has_file_input(&self, form: &Self::Element) -> bool;
	/// Reads `form`'s successful controls, including file contents.
	async fn serialize_form(&self, form: &Self::Element) -> Result<Payload, DomError>;

	fn focus(&self, element: &Self::Element) -> Result<(), DomError>;
	fn current_url(&self) -> Result<String, DomError>;
	/// Leaves the page.
	fn navigate(&self, url: &str) -> Result<(), DomError>;

	/// Calls `handler` on `event` at `element`.
	fn listen(&self, element: &Self::Element, event: &str, handler: Handler) -> Result<(), DomError>;
	/// Like [`Dom::listen`], for events that page scripts may trigger only through jQuery (e.g. Bootstrap's `shown.bs.modal`).
	fn listen_plugin_event(&self, element: &Self::Element, event: &str, handler: Handler) -> Result<(), DomError> {
		self.listen(element, event, handler)
	}
	/// Like [`Dom::listen`] for `submit`, but cancels the native submission first.
	fn intercept_submit(&self, form: &Self::Element, handler: Handler) -> Result<(), DomError>;
	/// Releases listeners held for elements that have left the document.
	fn release_detached(&self);

	/// Runs `future` on the page's event loop.
	fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}
