//! Core types for Corretora.
//!
//! This module provides type-safe wrappers for the documents and identities
//! the backend reacts to.

pub mod claims;
pub mod documents;
pub mod path;
pub mod tags;
pub mod uid;

pub use claims::{ADMIN_CLAIM, CustomClaims, derive_is_admin};
pub use documents::{AuthorRole, ChatDocument, MessageDocument, NewsDocument, UserProfile};
pub use path::{DocPath, DocPathError, collections};
pub use tags::{MAX_TAGS, MIN_TAGS, TAG_VOCABULARY, TagVocabulary};
pub use uid::{Uid, UidError};
