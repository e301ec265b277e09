//! DealGrid Core - Shared types library.
//!
//! This crate provides common types used across all DealGrid components:
//! - `app` - Session bootstrap workflow and the app-shell binary
//! - `integration-tests` - End-to-end workflow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe identifiers, emails, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
