#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod bus;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod coordinator;
#[doc(hidden)]
pub mod diagnostics;
pub mod error;
#[doc(hidden)]
pub mod observability;
pub mod page;
pub mod panel;
pub mod runtime;
pub mod settings;
pub mod watcher;

pub use config::Config;
