//! One-time page setup, and the browser entry point.

use crate::{
	binder::BindReport,
	browser::BrowserTransport,
	config::PageConfig,
	dom::Dom,
	error::DomError,
	page::AsyncPage,
	payload::Payload,
	session::SessionContext,
	transport::Transport,
	web::WebDom,
};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
use wasm_bindgen_futures::future_to_promise;

impl<D: Dom + 'static, T: Transport + 'static> AsyncPage<D, T> {
	/// Runs the page's one-time affordances, then the first binding pass.
	///
	/// - The first autofocus element is focused, and so is the first one inside a modal whenever it is shown.
	/// - Table rows with a target URL navigate there when clicked anywhere.
	///
	/// Failures here are logged and skipped.
	#[instrument(skip(self))]
	pub fn bootstrap(&self) -> BindReport {
		if let Err(error) = self.autofocus() {
			warn!("Autofocus failed: {}", error);
		}
		if let Err(error) = self.wire_modals() {
			warn!("Could not wire modal autofocus: {}", error);
		}
		if let Err(error) = self.wire_rows() {
			warn!("Could not wire clickable rows: {}", error);
		}
		self.bind_all()
	}

	fn autofocus(&self) -> Result<(), DomError> {
		let dom = self.dom();
		if let Some(first) = dom.query_all(&self.config().autofocus_selector())?.first() {
			dom.focus(first)?;
		}
		Ok(())
	}

	fn wire_modals(&self) -> Result<(), DomError> {
		let dom = self.dom();
		let config = self.config();
		for modal in dom.query_all(&config.modal_selector)? {
			let target = modal.clone();
			let handler = self.handler(move |page| {
				let dom = page.dom();
				let focused = dom
					.query_first_within(&target, &page.config().autofocus_selector())
					.and_then(|first| first.map_or(Ok(()), |first| dom.focus(&first)));
				if let Err(error) = focused {
					warn!("Modal autofocus failed: {}", error);
				}
			});
			dom.listen_plugin_event(&modal, &config.modal_shown_event, handler)?;
		}
		Ok(())
	}

	fn wire_rows(&self) -> Result<(), DomError> {
		let dom = self.dom();
		let config = self.config();
		for row in dom.query_all(&config.row_selector)? {
			dom.set_style(&row, "cursor", "pointer")?;
			let target = row.clone();
			let handler = self.handler(move |page| {
				let dom = page.dom();
				// Read at click time, so updates to the attribute are honoured.
				match dom.attribute(&target, &page.config().row_href_attribute) {
					Some(href) => {
						if let Err(error) = dom.navigate(&href) {
							error!("Row navigation failed: {}", error);
						}
					}
					None => trace!("Clicked row has no target anymore."),
				}
			});
			dom.listen(&row, "click", handler)?;
		}
		Ok(())
	}
}

/// JavaScript handle to the page started by [`start`].
#[wasm_bindgen]
pub struct PageHandle {
	page: AsyncPage<WebDom, BrowserTransport>,
}

#[wasm_bindgen]
impl PageHandle {
	/// Invokes `action` with the enumerable string properties of `args`.
	///
	/// The returned promise resolves to the response's `data`, or rejects with the error message.
	/// See [`payload_from_js`] for how `args` are converted.
	#[wasm_bindgen(js_name = doAction)]
	pub fn do_action(&self, action: String, args: JsValue) -> js_sys::Promise {
		let page = self.page.clone();
		future_to_promise(async move {
			let payload = payload_from_js(&args)?;
			let outcome = page.dispatch(&action, payload).await?;
			js_sys::JSON::parse(&outcome.data.to_string())
		})
	}

	/// Binds async forms inserted by other scripts.
	#[wasm_bindgen(js_name = bindForms)]
	pub fn bind_forms(&self) -> usize {
		self.page.bind_all().newly_bound
	}
}

impl PageHandle {
	#[must_use]
	pub fn page(&self) -> &AsyncPage<WebDom, BrowserTransport> {
		&self.page
	}
}

/// Converts the arguments of [`PageHandle::do_action`] into a [`Payload`].
///
/// Strings are taken as they are and other values as JSON.
/// `undefined` and function values are skipped, like `jQuery.param` does.
///
/// # Errors
///
/// Iff `args` is neither an object nor nullish, or a value has no JSON form (e.g. a symbol).
pub fn payload_from_js(args: &JsValue) -> Result<Payload, JsValue> {
	let mut payload = Payload::new();
	if args.is_undefined() || args.is_null() {
		return Ok(payload);
	}
	let object: &js_sys::Object = args.dyn_ref().ok_or_else(|| JsValue::from_str("action arguments must be an object"))?;
	for entry in js_sys::Object::entries(object).iter() {
		let entry: js_sys::Array = entry.unchecked_into();
		let name = entry.get(0).as_string().unwrap_or_default();
		let value = entry.get(1);
		if value.is_undefined() || value.is_function() {
			trace!(field = %name, "Skipping argument without a value.");
			continue;
		}
		let value = match value.as_string() {
			Some(text) => text,
			None => JsValue::from(js_sys::JSON::stringify(&value)?)
				.as_string()
				.ok_or_else(|| JsValue::from_str(&format!("action argument {:?} can't be serialized", name)))?,
		};
		payload.insert(name, value);
	}
	Ok(payload)
}

/// Runs `f` once `document` is interactive: at `DOMContentLoaded` while it is still loading, right away otherwise.
///
/// # Errors
///
/// Iff the event listener can't be added.
pub fn when_ready(document: &web_sys::Document, f: impl 'static + FnOnce()) -> Result<(), JsValue> {
	if document.ready_state() == "loading" {
		trace!("Waiting for DOMContentLoaded.");
		let ready = Closure::once_into_js(f);
		let options = web_sys::AddEventListenerOptions::new();
		options.set_once(true);
		document.add_event_listener_with_callback_and_add_event_listener_options("DOMContentLoaded", ready.unchecked_ref(), &options)?;
	} else {
		f();
	}
	Ok(())
}

/// Creates the page layer for the current document and bootstraps it once the document is interactive.
///
/// # Errors
///
/// Iff there is no document to attach to.
#[wasm_bindgen]
pub fn start() -> Result<PageHandle, JsValue> {
	let config = PageConfig::default();
	let dom = WebDom::new().map_err(|error| JsValue::from_str(&error.to_string()))?;
	let session = SessionContext::from_window(dom.window(), &config);
	let document = dom.document().clone();
	let page = AsyncPage::new(config, session, dom, BrowserTransport);

	let waiting = page.clone();
	when_ready(&document, move || {
		waiting.bootstrap();
	})?;
	Ok(PageHandle { page })
}
