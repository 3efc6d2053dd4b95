//! ourclass: register a teacher's class with the school backend
//!
//! The heart of the crate is [`flow::ClassInfoEntryFlow`], the view-model of
//! the "our class" form. The [`api`] module talks to the backend, [`tui`]
//! renders the form in a terminal, and [`cli`] exposes one-shot commands.

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod flow;
pub mod models;
pub mod tui;

pub use errors::{ApiError, SubmitError, ValidationError};
pub use flow::{ClassInfoEntryFlow, FlowState, Navigator};
