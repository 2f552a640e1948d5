//! Corretora Core - Shared domain types.
//!
//! This crate provides the types shared by every Corretora component:
//! - `functions` - HTTP entry points and document-event triggers
//! - `cli` - Standalone maintenance scripts (ingestion, backfills, sitemap)
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! document-store access, no HTTP clients. The derivation rules for the
//! `admin` claim live here so every entry point computes them the same way.
//!
//! # Modules
//!
//! - [`types`] - Uids, custom claims, document paths, document models and the tag vocabulary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
