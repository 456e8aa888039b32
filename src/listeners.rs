use crate::dom::ElementKey;
use hashbrown::HashMap;
use tracing::trace;
use wasm_bindgen::closure::Closure;

pub(crate) type Listener = Closure<dyn Fn(web_sys::Event)>;

/// Keeps event listener closures alive for as long as their element is in the document.
///
/// Dropping a [`Closure`] invalidates the JavaScript function, so entries must only be removed once
/// their element can't dispatch events to them anymore.
#[derive(Debug, Default)]
pub(crate) struct ListenerMap(HashMap<ElementKey, (web_sys::Element, Vec<Listener>)>);

impl ListenerMap {
	pub fn insert(&mut self, key: ElementKey, element: &web_sys::Element, listener: Listener) {
		self.0.entry(key).or_insert_with(|| (element.clone(), Vec::new())).1.push(listener);
		trace!(?key, "Created listener closure.");
	}

	/// Drops the closures of detached elements. Returns how many were dropped.
	pub fn prune(&mut self) -> usize {
		let mut dropped = 0;
		self.0.retain(|key, (element, listeners)| {
			let connected = element.is_connected();
			if !connected {
				trace!(?key, "Destroying {} listener closure(s).", listeners.len());
				dropped += listeners.len();
			}
			connected
		});
		dropped
	}

	pub fn len(&self) -> usize {
		self.0.values().map(|(_, listeners)| listeners.len()).sum()
	}
}
