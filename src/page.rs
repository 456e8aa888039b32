use crate::{
	binder::{self, BindReport, BindingRegistry},
	config::{Endpoint, PageConfig},
	dom::{Dom, Handler},
	error::{ApplyError, DispatchError, TransportError},
	payload::Payload,
	request::ActionRequest,
	response::{ActionOutcome, ServerResponse},
	session::SessionContext,
	transport::Transport,
	update::{apply_program, UpdateProgram},
};
use core::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace};

/// The asynchronous binding layer of one page: dispatcher, applicator and binder sharing one [`SessionContext`].
///
/// Cloning yields another handle to the same page.
pub struct AsyncPage<D: Dom, T: Transport> {
	shared: Rc<Shared<D, T>>,
}

impl<D: Dom, T: Transport> Clone for AsyncPage<D, T> {
	fn clone(&self) -> Self {
		Self { shared: self.shared.clone() }
	}
}

struct Shared<D: Dom, T: Transport> {
	config: PageConfig,
	session: SessionContext,
	dom: D,
	transport: T,
	bindings: RefCell<BindingRegistry>,
}

impl<D: Dom + 'static, T: Transport + 'static> AsyncPage<D, T> {
	#[must_use]
	pub fn new(config: PageConfig, session: SessionContext, dom: D, transport: T) -> Self {
		Self {
			shared: Rc::new(Shared {
				config,
				session,
				dom,
				transport,
				bindings: RefCell::default(),
			}),
		}
	}

	#[must_use]
	pub fn config(&self) -> &PageConfig {
		&self.shared.config
	}

	#[must_use]
	pub fn session(&self) -> &SessionContext {
		&self.shared.session
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.shared.dom
	}

	#[must_use]
	pub fn transport(&self) -> &T {
		&self.shared.transport
	}

	/// Whether `element` has a submission interceptor installed by this page.
	#[must_use]
	pub fn is_bound(&self, element: &D::Element) -> bool {
		self.shared.bindings.borrow().is_bound(self.shared.dom.key(element))
	}

	#[must_use]
	pub fn bound_count(&self) -> usize {
		self.shared.bindings.borrow().bound_count()
	}

	fn endpoint(&self) -> Result<String, DispatchError> {
		match &self.shared.config.endpoint {
			Endpoint::CurrentPage => Ok(self.shared.dom.current_url()?),
			Endpoint::Fixed(url) => Ok(url.clone()),
		}
	}

	/// Invokes the server-side handler `action` with `payload`, then applies the returned update.
	///
	/// The action name and session fields are merged into `payload` at send time.
	///
	/// # Errors
	///
	/// Transport and protocol failures leave the document untouched.
	/// An [`ApplyError`] may leave the update partially applied.
	/// Nothing is retried.
	#[instrument(skip(self, payload), fields(fields = payload.len()))]
	pub async fn dispatch(&self, action: &str, mut payload: Payload) -> Result<ActionOutcome, DispatchError> {
		let config = &self.shared.config;
		payload.insert(config.action_field.as_str(), action);
		self.shared.session.stamp(&mut payload, config);
		let request = ActionRequest::for_action(self.endpoint()?, payload)?;
		self.send(request).await
	}

	/// Submits `form` through the transport instead of natively.
	///
	/// Same as [`AsyncPage::dispatch`], but the payload is the form's serialized fields (without an action name),
	/// and forms with file inputs are sent as multipart.
	///
	/// # Errors
	///
	/// See [`AsyncPage::dispatch`].
	#[instrument(skip(self))]
	pub async fn submit_form(&self, form: &D::Element) -> Result<ActionOutcome, DispatchError> {
		let dom = &self.shared.dom;
		let mut payload = dom.serialize_form(form).await?;
		self.shared.session.stamp(&mut payload, &self.shared.config);
		let request = ActionRequest::for_form(self.endpoint()?, payload, dom.has_file_input(form));
		self.send(request).await
	}

	/// Saves the content of an inline-editable element through the `_save_term` action.
	///
	/// # Errors
	///
	/// See [`AsyncPage::dispatch`].
	#[instrument(skip(self))]
	pub async fn content_changed(&self, element: &D::Element) -> Result<ActionOutcome, DispatchError> {
		let dom = &self.shared.dom;
		let payload = Payload::new()
			.with("name", dom.attribute(element, "data-name").unwrap_or_default())
			.with("content", dom.inner_html(element));
		self.dispatch("_save_term", payload).await
	}

	async fn send(&self, request: ActionRequest) -> Result<ActionOutcome, DispatchError> {
		if cfg!(feature = "dangerous-logging") {
			trace!(?request, "Sending request.");
		} else {
			trace!(url = %request.url, encoding = ?request.encoding, fields = request.payload.len(), "Sending request.");
		}

		let response = self.shared.transport.send(request).await?;
		if !response.is_success() {
			return Err(TransportError::Status {
				status: response.status,
				body: response.body,
			}
			.into());
		}
		let response = ServerResponse::parse(&response.body)?;
		self.apply(&response.instructions)?;
		Ok(response.into())
	}

	/// Executes update instructions against the document, then binds any newly inserted async forms.
	///
	/// # Errors
	///
	/// A malformed program changes nothing.
	/// A failing operation leaves earlier ones applied, and skips the binding pass.
	#[instrument(skip(self, instructions), fields(len = instructions.len()))]
	pub fn apply(&self, instructions: &str) -> Result<(), ApplyError> {
		let program: UpdateProgram = instructions.parse()?;
		apply_program(&self.shared.dom, &program)?;
		self.bind_all();
		Ok(())
	}

	/// Binds all async forms that aren't bound yet. Idempotent.
	pub fn bind_all(&self) -> BindReport {
		let shared = &*self.shared;
		let report = binder::bind_all(&shared.dom, &shared.config, &shared.session, &mut shared.bindings.borrow_mut(), |form| {
			self.handler(move |page| page.spawn_submit(form.clone()))
		});
		if report.newly_bound > 0 {
			info!("Bound {} form(s).", report.newly_bound);
		}
		report
	}

	/// Submits `form` in the background. There is no caller to report failures to, so they are logged.
	fn spawn_submit(&self, form: D::Element) {
		let page = self.clone();
		self.shared.dom.spawn(Box::pin(async move {
			if let Err(error) = page.submit_form(&form).await {
				error!("Form submission failed: {}", error);
			}
		}));
	}

	/// Wraps `f` into an event handler that doesn't keep the page alive.
	pub(crate) fn handler(&self, f: impl Fn(&Self) + 'static) -> Handler {
		let weak: Weak<Shared<D, T>> = Rc::downgrade(&self.shared);
		Rc::new(move || match weak.upgrade() {
			Some(shared) => f(&AsyncPage { shared }),
			None => error!("Event handled after its page was dropped."),
		})
	}
}
