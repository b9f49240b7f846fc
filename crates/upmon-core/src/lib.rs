//! Core logic for the upstream strategy monitor.
//!
//! Version extraction, retrying fetches, the check/download/notify/reload
//! engine and all user-visible text live here. Telegram is an adapter crate
//! implementing `messaging::port::NotificationSink`.

pub mod commits;
pub mod compare;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod history;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod security;
pub mod utils;
pub mod version;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
