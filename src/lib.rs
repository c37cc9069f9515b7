//! EasyFind - a demo marketplace service
//!
//! Users book service providers, chat with them, ask for urgent help and
//! leave reviews; administrators moderate accounts and providers. All data
//! lives in an in-memory mock store loaded from a `db.json` document.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod server;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cli::Args;
