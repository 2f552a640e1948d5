//! Corretora functions library.
//!
//! HTTP endpoints and document-event triggers for the Corretora insurance
//! brokerage website. Exposed as a library so the router, services and store
//! adapters can be driven from tests and from the maintenance CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod google;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod stores;
pub mod triggers;

pub use config::FunctionsConfig;
pub use routes::app;
pub use state::{AppState, Backends};
