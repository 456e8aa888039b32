//! [`Dom`] over the browser's live document.

use crate::{
	dom::{Dom, ElementKey, Handler, InsertPosition},
	error::DomError,
	listeners::{Listener, ListenerMap},
	payload::{FieldValue, Payload},
};
use async_trait::async_trait;
use core::{
	cell::RefCell,
	sync::atomic::{AtomicU32, Ordering},
};
use futures::future::LocalBoxFuture;
use tracing::{debug, instrument, trace};
use wasm_bindgen::{closure::Closure, throw_str, JsCast, JsValue, UnwrapThrowExt};
use wasm_bindgen_futures::JsFuture;

/// Expando property holding an element's [`ElementKey`].
const KEY_PROPERTY: &str = "__partialDomKey";

/// Shared by all [`WebDom`]s, since they see the same elements.
static NEXT_KEY: AtomicU32 = AtomicU32::new(0);

#[derive(Debug)]
pub struct WebDom {
	window: web_sys::Window,
	document: web_sys::Document,
	listeners: RefCell<ListenerMap>,
}

impl WebDom {
	/// Attaches to the current window's document.
	///
	/// # Errors
	///
	/// Iff there is no window or document, e.g. in a worker.
	pub fn new() -> Result<Self, DomError> {
		let window = web_sys::window().ok_or_else(|| DomError::Js("no global `window`".to_owned()))?;
		let document = window.document().ok_or_else(|| DomError::Js("no `window.document`".to_owned()))?;
		Ok(Self {
			window,
			document,
			listeners: RefCell::default(),
		})
	}

	#[must_use]
	pub fn window(&self) -> &web_sys::Window {
		&self.window
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Number of listener closures currently kept alive.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	fn add_listener(&self, element: &web_sys::Element, event: &str, listener: Listener) -> Result<(), DomError> {
		element.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())?;
		self.listeners.borrow_mut().insert(self.key(element), element, listener);
		Ok(())
	}

	fn jquery(&self) -> Option<js_sys::Function> {
		js_sys::Reflect::get(&self.window, &JsValue::from_str("jQuery")).ok()?.dyn_into().ok()
	}

	async fn read_file(file: &web_sys::File) -> Result<Vec<u8>, DomError> {
		let buffer = JsFuture::from(file.array_buffer()).await?;
		Ok(js_sys::Uint8Array::new(&buffer).to_vec())
	}
}

fn html_element(element: &web_sys::Element) -> Result<&web_sys::HtmlElement, DomError> {
	element
		.dyn_ref::<web_sys::HtmlElement>()
		.ok_or_else(|| DomError::Js(format!("<{}> is not an HTML element", element.tag_name())))
}

#[async_trait(?Send)]
impl Dom for WebDom {
	type Element = web_sys::Element;

	fn query_all(&self, selector: &str) -> Result<Vec<web_sys::Element>, DomError> {
		let nodes = self.document.query_selector_all(selector).map_err(|_| DomError::Selector(selector.to_owned()))?;
		Ok((0..nodes.length())
			.filter_map(|i| nodes.get(i))
			.filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
			.collect())
	}

	fn query_first_within(&self, scope: &web_sys::Element, selector: &str) -> Result<Option<web_sys::Element>, DomError> {
		scope.query_selector(selector).map_err(|_| DomError::Selector(selector.to_owned()))
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn key(&self, element: &web_sys::Element) -> ElementKey {
		let property = JsValue::from_str(KEY_PROPERTY);
		let existing = js_sys::Reflect::get(element, &property).ok().and_then(|key| key.as_f64());
		if let Some(key) = existing {
			return ElementKey(key as u32);
		}

		let key = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
		if key == u32::MAX {
			throw_str("partial-dom: Element keys exhausted.");
		}
		js_sys::Reflect::set(element, &property, &JsValue::from(key)).expect_throw("partial-dom: Could not store an element key.");
		ElementKey(key)
	}

	fn is_connected(&self, element: &web_sys::Element) -> bool {
		element.is_connected()
	}

	fn attribute(&self, element: &web_sys::Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn set_attribute(&self, element: &web_sys::Element, name: &str, value: &str) -> Result<(), DomError> {
		Ok(element.set_attribute(name, value)?)
	}

	fn remove_attribute(&self, element: &web_sys::Element, name: &str) -> Result<(), DomError> {
		Ok(element.remove_attribute(name)?)
	}

	fn set_style(&self, element: &web_sys::Element, property: &str, value: &str) -> Result<(), DomError> {
		Ok(html_element(element)?.style().set_property(property, value)?)
	}

	fn inner_html(&self, element: &web_sys::Element) -> String {
		element.inner_html()
	}

	fn set_inner_html(&self, element: &web_sys::Element, html: &str) -> Result<(), DomError> {
		element.set_inner_html(html);
		Ok(())
	}

	fn set_outer_html(&self, element: &web_sys::Element, html: &str) -> Result<(), DomError> {
		if element.parent_node().is_none() {
			return Err(DomError::Js(format!("detached <{}> can't be replaced", element.tag_name())));
		}
		element.set_outer_html(html);
		Ok(())
	}

	fn insert_html(&self, element: &web_sys::Element, position: InsertPosition, html: &str) -> Result<(), DomError> {
		Ok(element.insert_adjacent_html(position.as_str(), html)?)
	}

	fn remove(&self, element: &web_sys::Element) -> Result<(), DomError> {
		element.remove();
		Ok(())
	}

	#[instrument(skip(self, value))]
	fn upsert_hidden_input(&self, form: &web_sys::Element, name: &str, value: &str) -> Result<(), DomError> {
		let hidden = form.query_selector_all("input[type=hidden]")?;
		let existing = (0..hidden.length())
			.filter_map(|i| hidden.get(i))
			.filter_map(|node| node.dyn_into::<web_sys::HtmlInputElement>().ok())
			.find(|input| input.name() == name);

		match existing {
			Some(input) => input.set_value(value),
			None => {
				let input = self.document.create_element("input")?.unchecked_into::<web_sys::HtmlInputElement>();
				input.set_type("hidden");
				input.set_name(name);
				input.set_value(value);
				form.append_child(&input)?;
				trace!("Appended hidden input.");
			}
		}
		Ok(())
	}

	fn has_file_input(&self, form: &web_sys::Element) -> bool {
		matches!(form.query_selector("input[type=file]"), Ok(Some(_)))
	}

	#[instrument(skip(self))]
	async fn serialize_form(&self, form: &web_sys::Element) -> Result<Payload, DomError> {
		let form = form.dyn_ref::<web_sys::HtmlFormElement>().ok_or_else(|| DomError::Js(format!("<{}> is not a form", form.tag_name())))?;
		let form_data = web_sys::FormData::new_with_form(form)?;
		let entries = js_sys::try_iter(&form_data)?.ok_or_else(|| DomError::Js("`FormData` is not iterable".to_owned()))?;

		let mut payload = Payload::new();
		for entry in entries {
			let entry: js_sys::Array = entry?.unchecked_into();
			let name = entry.get(0).as_string().unwrap_or_default();
			let value = entry.get(1);
			let value = match value.as_string() {
				Some(text) => FieldValue::Text(text),
				None => {
					let file: web_sys::File = value.dyn_into().map_err(DomError::from)?;
					let bytes = Self::read_file(&file).await?;
					debug!(field = %name, len = bytes.len(), "Read file field.");
					FieldValue::File {
						file_name: file.name(),
						content_type: file.type_(),
						bytes,
					}
				}
			};
			payload.insert(name, value);
		}
		Ok(payload)
	}

	fn focus(&self, element: &web_sys::Element) -> Result<(), DomError> {
		Ok(html_element(element)?.focus()?)
	}

	fn current_url(&self) -> Result<String, DomError> {
		Ok(self.window.location().href()?)
	}

	fn navigate(&self, url: &str) -> Result<(), DomError> {
		Ok(self.window.location().set_href(url)?)
	}

	fn listen(&self, element: &web_sys::Element, event: &str, handler: Handler) -> Result<(), DomError> {
		let listener = Closure::wrap(Box::new(move |_: web_sys::Event| handler()) as Box<dyn Fn(web_sys::Event)>);
		self.add_listener(element, event, listener)
	}

	/// Registers through `window.jQuery(element).on(…)` if jQuery is loaded, natively otherwise.
	///
	/// jQuery-triggered events never reach `addEventListener`, and Bootstrap triggers through jQuery whenever it's there.
	#[instrument(skip(self, handler))]
	fn listen_plugin_event(&self, element: &web_sys::Element, event: &str, handler: Handler) -> Result<(), DomError> {
		let jquery = match self.jquery() {
			Some(jquery) => jquery,
			None => return self.listen(element, event, handler),
		};
		let wrapped = jquery.call1(&JsValue::UNDEFINED, element)?;
		let on: js_sys::Function = js_sys::Reflect::get(&wrapped, &JsValue::from_str("on"))?.dyn_into()?;
		// The argument is a jQuery event object, not a DOM `Event`. It's never read.
		let listener: Listener = Closure::wrap(Box::new(move |_: web_sys::Event| handler()) as Box<dyn Fn(web_sys::Event)>);
		on.call2(&wrapped, &JsValue::from_str(event), listener.as_ref())?;
		self.listeners.borrow_mut().insert(self.key(element), element, listener);
		trace!("Listening through jQuery.");
		Ok(())
	}

	fn intercept_submit(&self, form: &web_sys::Element, handler: Handler) -> Result<(), DomError> {
		let listener = Closure::wrap(Box::new(move |event: web_sys::Event| {
			event.prevent_default();
			handler();
		}) as Box<dyn Fn(web_sys::Event)>);
		self.add_listener(form, "submit", listener)
	}

	fn release_detached(&self) {
		let dropped = self.listeners.borrow_mut().prune();
		if dropped > 0 {
			debug!("Released {} listener(s) of detached elements.", dropped);
		}
	}

	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		wasm_bindgen_futures::spawn_local(future);
	}
}
