//! Terminal user interface for registering a class
//!
//! One form screen drives the [`crate::flow::ClassInfoEntryFlow`] view-model;
//! a successful submission forwards to a confirmation screen.

pub mod app;
pub mod events;
pub mod screens;
pub mod traits;
pub mod ui;

pub use app::App;
pub use events::AppEvent;
