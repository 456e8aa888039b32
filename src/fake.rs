//! An in-memory [`Dom`] for unit tests.
//!
//! Markup isn't parsed. Instead, tests register which elements a given HTML string produces with [`FakeDom::fixture`].

use crate::{
	dom::{Dom, ElementKey, Handler, InsertPosition},
	error::DomError,
	payload::{FieldValue, Payload},
};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use hashbrown::HashMap;
use std::{
	cell::{Cell, RefCell},
	collections::VecDeque,
};

const DOCUMENT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeElement(usize);

#[derive(Debug, Clone, Default)]
pub struct Spec {
	tag: String,
	attributes: Vec<(String, String)>,
	fields: Vec<(String, FieldValue)>,
	file_input: bool,
	children: Vec<Spec>,
}

impl Spec {
	pub fn id(self, id: &str) -> Self {
		self.attr("id", id)
	}

	pub fn class(self, class: &str) -> Self {
		self.attr("class", class)
	}

	pub fn attr(mut self, name: &str, value: &str) -> Self {
		self.attributes.push((name.to_owned(), value.to_owned()));
		self
	}

	pub fn field(mut self, name: &str, value: &str) -> Self {
		self.fields.push((name.to_owned(), FieldValue::from(value)));
		self
	}

	pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
		self.file_input = true;
		self.fields.push((
			name.to_owned(),
			FieldValue::File {
				file_name: file_name.to_owned(),
				content_type: content_type.to_owned(),
				bytes: bytes.to_vec(),
			},
		));
		self
	}

	pub fn child(mut self, child: Spec) -> Self {
		self.children.push(child);
		self
	}
}

struct Node {
	tag: String,
	attributes: Vec<(String, String)>,
	fields: Vec<(String, FieldValue)>,
	file_input: bool,
	styles: Vec<(String, String)>,
	html: String,
	parent: Option<usize>,
	children: Vec<usize>,
	listeners: Vec<(String, bool, Handler)>,
}

impl Node {
	fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}
}

pub struct FakeDom {
	nodes: RefCell<Vec<Node>>,
	fixtures: RefCell<HashMap<String, Vec<Spec>>>,
	spawned: RefCell<VecDeque<LocalBoxFuture<'static, ()>>>,
	pub navigations: RefCell<Vec<String>>,
	pub native_submissions: Cell<usize>,
	pub focused: Cell<Option<ElementKey>>,
	pub released_listeners: Cell<usize>,
	/// This many upcoming [`Dom::remove_attribute`] calls fail.
	pub failing_removals: Cell<usize>,
}

impl FakeDom {
	pub const URL: &'static str = "https://example.test/page/";

	pub fn new() -> Self {
		let document = Node {
			tag: "#document".to_owned(),
			attributes: Vec::new(),
			fields: Vec::new(),
			file_input: false,
			styles: Vec::new(),
			html: String::new(),
			parent: None,
			children: Vec::new(),
			listeners: Vec::new(),
		};
		Self {
			nodes: RefCell::new(vec![document]),
			fixtures: RefCell::default(),
			spawned: RefCell::default(),
			navigations: RefCell::default(),
			native_submissions: Cell::new(0),
			focused: Cell::new(None),
			released_listeners: Cell::new(0),
			failing_removals: Cell::new(0),
		}
	}

	pub fn element(tag: &str) -> Spec {
		Spec {
			tag: tag.to_owned(),
			..Spec::default()
		}
	}

	/// Appends `spec` to `parent`, or to the document.
	pub fn add(&self, parent: Option<&FakeElement>, spec: Spec) -> FakeElement {
		let parent = parent.map_or(DOCUMENT, |parent| parent.0);
		let index = self.nodes.borrow()[parent].children.len();
		self.instantiate(parent, index, &spec)
	}

	/// Declares the elements produced when `html` is inserted.
	pub fn fixture(&self, html: &str, specs: Vec<Spec>) {
		self.fixtures.borrow_mut().insert(html.to_owned(), specs);
	}

	fn instantiate(&self, parent: usize, index: usize, spec: &Spec) -> FakeElement {
		let mut nodes = self.nodes.borrow_mut();
		let id = nodes.len();
		nodes.push(Node {
			tag: spec.tag.clone(),
			attributes: spec.attributes.clone(),
			fields: spec.fields.clone(),
			file_input: spec.file_input,
			styles: Vec::new(),
			html: String::new(),
			parent: Some(parent),
			children: Vec::new(),
			listeners: Vec::new(),
		});
		nodes[parent].children.insert(index, id);
		drop(nodes);
		for (i, child) in spec.children.iter().enumerate() {
			self.instantiate(id, i, child);
		}
		FakeElement(id)
	}

	fn insert_markup(&self, parent: usize, index: usize, html: &str) {
		let specs = self.fixtures.borrow().get(html).cloned().unwrap_or_default();
		for (i, spec) in specs.iter().enumerate() {
			self.instantiate(parent, index + i, spec);
		}
	}

	fn detach(&self, id: usize) {
		let mut nodes = self.nodes.borrow_mut();
		if let Some(parent) = nodes[id].parent.take() {
			nodes[parent].children.retain(|&child| child != id);
		}
	}

	fn position(&self, id: usize) -> Result<(usize, usize), DomError> {
		let nodes = self.nodes.borrow();
		let parent = nodes[id].parent.ok_or_else(|| DomError::Js("element has no parent".to_owned()))?;
		let index = nodes[parent].children.iter().position(|&child| child == id).unwrap_or(0);
		Ok((parent, index))
	}

	fn descendants(&self, root: usize) -> Vec<usize> {
		let nodes = self.nodes.borrow();
		let mut order = Vec::new();
		let mut stack: Vec<usize> = nodes[root].children.iter().rev().copied().collect();
		while let Some(id) = stack.pop() {
			order.push(id);
			stack.extend(nodes[id].children.iter().rev());
		}
		order
	}

	fn matches(&self, id: usize, selector: &str) -> Result<bool, DomError> {
		let nodes = self.nodes.borrow();
		let compounds: Vec<&str> = selector.split_whitespace().collect();
		let (last, ancestors) = compounds.split_last().ok_or_else(|| DomError::Selector(selector.to_owned()))?;
		if !compound_matches(&nodes[id], last)? {
			return Ok(false);
		}
		let mut current = nodes[id].parent;
		for compound in ancestors.iter().rev() {
			loop {
				match current {
					None | Some(DOCUMENT) => return Ok(false),
					Some(ancestor) => {
						current = nodes[ancestor].parent;
						if compound_matches(&nodes[ancestor], compound)? {
							break;
						}
					}
				}
			}
		}
		Ok(true)
	}

	fn dispatch(&self, element: &FakeElement, event: &str) -> bool {
		let listeners: Vec<(bool, Handler)> = self.nodes.borrow()[element.0]
			.listeners
			.iter()
			.filter(|(name, _, _)| name == event)
			.map(|(_, prevent_default, handler)| (*prevent_default, handler.clone()))
			.collect();
		let prevented = listeners.iter().any(|(prevent_default, _)| *prevent_default);
		for (_, handler) in listeners {
			handler();
		}
		prevented
	}

	/// Submits `form` like a user would. Returns whether the native submission was cancelled.
	pub fn submit(&self, form: &FakeElement) -> bool {
		let intercepted = self.dispatch(form, "submit");
		if !intercepted {
			self.native_submissions.set(self.native_submissions.get() + 1);
		}
		intercepted
	}

	pub fn fire(&self, element: &FakeElement, event: &str) {
		self.dispatch(element, event);
	}

	pub fn listener_count(&self, element: &FakeElement, event: &str) -> usize {
		self.nodes.borrow()[element.0].listeners.iter().filter(|(name, _, _)| name == event).count()
	}

	pub fn field(&self, form: &FakeElement, name: &str) -> Option<String> {
		self.nodes.borrow()[form.0].fields.iter().find(|(n, _)| n == name).and_then(|(_, value)| match value {
			FieldValue::Text(text) => Some(text.clone()),
			FieldValue::File { .. } => None,
		})
	}

	pub fn style(&self, element: &FakeElement, property: &str) -> Option<String> {
		self.nodes.borrow()[element.0].styles.iter().find(|(p, _)| p == property).map(|(_, v)| v.clone())
	}

	pub fn find(&self, selector: &str) -> FakeElement {
		self.query_all(selector).unwrap().into_iter().next().unwrap()
	}

	/// Drives spawned futures until none are left.
	pub fn run_spawned(&self) {
		loop {
			let next = self.spawned.borrow_mut().pop_front();
			match next {
				Some(future) => futures::executor::block_on(future),
				None => break,
			}
		}
	}
}

fn compound_matches(node: &Node, compound: &str) -> Result<bool, DomError> {
	let is_delimiter = |c: char| matches!(c, '#' | '.' | '[');
	let invalid = || DomError::Selector(compound.to_owned());

	let tag_end = compound.find(is_delimiter).unwrap_or(compound.len());
	let (tag, mut rest) = compound.split_at(tag_end);
	if !tag.is_empty() && tag != "*" && !tag.eq_ignore_ascii_case(&node.tag) {
		return Ok(false);
	}
	while let Some(first) = rest.chars().next() {
		let matched = match first {
			'#' | '.' => {
				let body = &rest[1..];
				let end = body.find(is_delimiter).unwrap_or(body.len());
				let name = &body[..end];
				rest = &body[end..];
				if first == '#' {
					node.attribute("id") == Some(name)
				} else {
					node.attribute("class").map_or(false, |classes| classes.split_whitespace().any(|class| class == name))
				}
			}
			'[' => {
				let end = rest.find(']').ok_or_else(invalid)?;
				let inner = &rest[1..end];
				rest = &rest[end + 1..];
				match inner.split_once('=') {
					Some((name, value)) => node.attribute(name) == Some(value.trim_matches('"')),
					None => node.attribute(inner).is_some(),
				}
			}
			_ => return Err(invalid()),
		};
		if !matched {
			return Ok(false);
		}
	}
	Ok(true)
}

#[async_trait(?Send)]
impl Dom for FakeDom {
	type Element = FakeElement;

	fn query_all(&self, selector: &str) -> Result<Vec<FakeElement>, DomError> {
		let mut found = Vec::new();
		for id in self.descendants(DOCUMENT) {
			if self.matches(id, selector)? {
				found.push(FakeElement(id));
			}
		}
		Ok(found)
	}

	fn query_first_within(&self, scope: &FakeElement, selector: &str) -> Result<Option<FakeElement>, DomError> {
		for id in self.descendants(scope.0) {
			if self.matches(id, selector)? {
				return Ok(Some(FakeElement(id)));
			}
		}
		Ok(None)
	}

	fn key(&self, element: &FakeElement) -> ElementKey {
		ElementKey(element.0 as u32)
	}

	fn is_connected(&self, element: &FakeElement) -> bool {
		let nodes = self.nodes.borrow();
		let mut current = element.0;
		loop {
			match nodes[current].parent {
				Some(DOCUMENT) => return true,
				Some(parent) => current = parent,
				None => return false,
			}
		}
	}

	fn attribute(&self, element: &FakeElement, name: &str) -> Option<String> {
		self.nodes.borrow()[element.0].attribute(name).map(ToOwned::to_owned)
	}

	fn set_attribute(&self, element: &FakeElement, name: &str, value: &str) -> Result<(), DomError> {
		let mut nodes = self.nodes.borrow_mut();
		let attributes = &mut nodes[element.0].attributes;
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => *existing = value.to_owned(),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
		Ok(())
	}

	fn remove_attribute(&self, element: &FakeElement, name: &str) -> Result<(), DomError> {
		if self.failing_removals.get() > 0 {
			self.failing_removals.set(self.failing_removals.get() - 1);
			return Err(DomError::Js(format!("can't remove {:?}", name)));
		}
		self.nodes.borrow_mut()[element.0].attributes.retain(|(n, _)| n != name);
		Ok(())
	}

	fn set_style(&self, element: &FakeElement, property: &str, value: &str) -> Result<(), DomError> {
		self.nodes.borrow_mut()[element.0].styles.push((property.to_owned(), value.to_owned()));
		Ok(())
	}

	fn inner_html(&self, element: &FakeElement) -> String {
		self.nodes.borrow()[element.0].html.clone()
	}

	fn set_inner_html(&self, element: &FakeElement, html: &str) -> Result<(), DomError> {
		let children = core::mem::take(&mut self.nodes.borrow_mut()[element.0].children);
		for child in children {
			self.nodes.borrow_mut()[child].parent = None;
		}
		self.nodes.borrow_mut()[element.0].html = html.to_owned();
		self.insert_markup(element.0, 0, html);
		Ok(())
	}

	fn set_outer_html(&self, element: &FakeElement, html: &str) -> Result<(), DomError> {
		let (parent, index) = self.position(element.0)?;
		self.detach(element.0);
		self.insert_markup(parent, index, html);
		Ok(())
	}

	fn insert_html(&self, element: &FakeElement, position: InsertPosition, html: &str) -> Result<(), DomError> {
		match position {
			InsertPosition::BeforeBegin => {
				let (parent, index) = self.position(element.0)?;
				self.insert_markup(parent, index, html);
			}
			InsertPosition::AfterEnd => {
				let (parent, index) = self.position(element.0)?;
				self.insert_markup(parent, index + 1, html);
			}
			InsertPosition::AfterBegin => self.insert_markup(element.0, 0, html),
			InsertPosition::BeforeEnd => {
				let index = self.nodes.borrow()[element.0].children.len();
				self.insert_markup(element.0, index, html);
			}
		}
		Ok(())
	}

	fn remove(&self, element: &FakeElement) -> Result<(), DomError> {
		self.detach(element.0);
		Ok(())
	}

	fn upsert_hidden_input(&self, form: &FakeElement, name: &str, value: &str) -> Result<(), DomError> {
		let mut nodes = self.nodes.borrow_mut();
		let fields = &mut nodes[form.0].fields;
		match fields.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => *existing = FieldValue::from(value),
			None => fields.push((name.to_owned(), FieldValue::from(value))),
		}
		Ok(())
	}

	fn has_file_input(&self, form: &FakeElement) -> bool {
		self.nodes.borrow()[form.0].file_input
	}

	async fn serialize_form(&self, form: &FakeElement) -> Result<Payload, DomError> {
		Ok(self.nodes.borrow()[form.0].fields.iter().cloned().collect())
	}

	fn focus(&self, element: &FakeElement) -> Result<(), DomError> {
		self.focused.set(Some(self.key(element)));
		Ok(())
	}

	fn current_url(&self) -> Result<String, DomError> {
		Ok(Self::URL.to_owned())
	}

	fn navigate(&self, url: &str) -> Result<(), DomError> {
		self.navigations.borrow_mut().push(url.to_owned());
		Ok(())
	}

	fn listen(&self, element: &FakeElement, event: &str, handler: Handler) -> Result<(), DomError> {
		self.nodes.borrow_mut()[element.0].listeners.push((event.to_owned(), false, handler));
		Ok(())
	}

	fn intercept_submit(&self, form: &FakeElement, handler: Handler) -> Result<(), DomError> {
		self.nodes.borrow_mut()[form.0].listeners.push(("submit".to_owned(), true, handler));
		Ok(())
	}

	fn release_detached(&self) {
		let detached: Vec<usize> = (1..self.nodes.borrow().len()).filter(|&id| !self.is_connected(&FakeElement(id))).collect();
		let mut nodes = self.nodes.borrow_mut();
		for id in detached {
			let released = nodes[id].listeners.len();
			nodes[id].listeners.clear();
			self.released_listeners.set(self.released_listeners.get() + released);
		}
	}

	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		self.spawned.borrow_mut().push_back(future);
	}
}
