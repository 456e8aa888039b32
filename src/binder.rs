//! Turns forms marked as asynchronous into intercepted ones.
//!
//! Each element instance goes through [`BindState::Unbound`] → [`BindState::Bound`] at most once.
//! The [`BindingRegistry`] is the authority on that, so binding stays idempotent even if the marker attribute reappears.

use crate::{
	config::PageConfig,
	dom::{Dom, ElementKey, Handler},
	error::DomError,
	session::SessionContext,
};
use hashbrown::HashMap;
use tracing::{error, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
	/// Discovered, but binding hasn't completed (yet).
	Unbound,
	Bound,
}

/// Element identity → binding state.
#[derive(Debug, Default)]
pub struct BindingRegistry(HashMap<ElementKey, BindState>);

impl BindingRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn state(&self, key: ElementKey) -> Option<BindState> {
		self.0.get(&key).copied()
	}

	#[must_use]
	pub fn is_bound(&self, key: ElementKey) -> bool {
		self.state(key) == Some(BindState::Bound)
	}

	/// Records `key` as discovered. Returns `false` iff it is already bound.
	pub fn discover(&mut self, key: ElementKey) -> bool {
		*self.0.entry(key).or_insert(BindState::Unbound) == BindState::Unbound
	}

	pub fn mark_bound(&mut self, key: ElementKey) {
		self.0.insert(key, BindState::Bound);
	}

	/// Forgets elements for which `keep` returns `false`.
	pub fn retain(&mut self, mut keep: impl FnMut(ElementKey) -> bool) {
		self.0.retain(|&key, _| keep(key));
	}

	#[must_use]
	pub fn bound_count(&self) -> usize {
		self.0.values().filter(|&&state| state == BindState::Bound).count()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Outcome of one [`bind_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BindReport {
	pub newly_bound: usize,
	pub already_bound: usize,
	/// Candidates left [`BindState::Unbound`] because a DOM operation failed. They are retried on the next pass.
	pub failed: usize,
}

/// Binds every async-marked form in the document that isn't bound yet.
///
/// For each candidate form, in this order:
///
/// 1. keep fields (and, if so configured, the security token) are written into hidden inputs,
/// 2. `on_submit(form)` is installed as a submission interceptor and the form is recorded as bound,
/// 3. the marker attribute is removed, if possible.
///
/// Hidden inputs are upserted, so a retry after a failure in step 2 doesn't duplicate them.
/// Once the interceptor is installed, the form is never bound again.
/// Detached elements are dropped from `registry` (and their listeners released) first.
#[instrument(skip_all)]
pub fn bind_all<D: Dom>(dom: &D, config: &PageConfig, session: &SessionContext, registry: &mut BindingRegistry, on_submit: impl Fn(D::Element) -> Handler) -> BindReport {
	dom.release_detached();

	let candidates = match dom.query_all(&config.async_form_selector()) {
		Ok(candidates) => candidates,
		Err(error) => {
			error!("Could not query async forms: {}", error);
			return BindReport::default();
		}
	};
	let connected: hashbrown::HashSet<ElementKey> = dom
		.query_all("form")
		.map(|forms| forms.iter().map(|form| dom.key(form)).collect())
		.unwrap_or_default();
	registry.retain(|key| connected.contains(&key));

	let mut report = BindReport::default();
	for form in candidates {
		let key = dom.key(&form);
		if !registry.discover(key) {
			trace!(?key, "Already bound.");
			report.already_bound += 1;
			continue;
		}

		match bind_one(dom, config, session, &form, on_submit(form.clone())) {
			Ok(()) => {
				registry.mark_bound(key);
				report.newly_bound += 1;
			}
			Err(error) => {
				error!(?key, "Failed to bind form: {}", error);
				report.failed += 1;
				continue;
			}
		}

		// The registry decides from here on, so a leftover marker is harmless.
		if let Err(error) = dom.remove_attribute(&form, &config.async_marker) {
			warn!(?key, "Could not remove the async marker: {}", error);
		}
	}
	trace!(?report, "Binding pass complete.");
	report
}

fn bind_one<D: Dom>(dom: &D, config: &PageConfig, session: &SessionContext, form: &D::Element, handler: Handler) -> Result<(), DomError> {
	dom.upsert_hidden_input(form, &config.keep_field, &session.keep_fields_json())?;
	if config.hidden_token_field {
		if let Some(token) = session.token() {
			dom.upsert_hidden_input(form, &config.token_field, token)?;
		}
	}
	dom.intercept_submit(form, handler)
}
