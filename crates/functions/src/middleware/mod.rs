//! HTTP middleware stack for the functions.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. CORS (permissive, answers preflights)
//! 3. `TraceLayer` (request span)
//! 4. Request ID (add unique ID to each request)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, make_request_span, request_id_middleware};
