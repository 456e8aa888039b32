//! Asynchronous forms and actions for server-rendered pages.
//!
//! Forms marked `data-async` are submitted through a [`Transport`](`transport::Transport`) instead of natively,
//! and the server's answer is applied to the live document as a list of [`UpdateOperation`](`update::UpdateOperation`)s.
//! Every request carries the page's [`SessionContext`](`session::SessionContext`).
//!
//! In the browser, call [`start`] once. Everything else hangs off [`AsyncPage`](`page::AsyncPage`).

#![doc(html_root_url = "https://docs.rs/partial-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod binder;
pub mod bootstrap;
pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod page;
pub mod payload;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;
pub mod update;
pub mod web;

mod listeners;

#[cfg(test)]
mod fake;

pub use bootstrap::{start, PageHandle};
