//! Google Cloud access-token plumbing shared by the Firestore and Identity
//! Toolkit adapters.

mod auth;

pub use auth::{GoogleAuth, GoogleAuthError, ServiceAccountKey};
