//! Prickly Pear Core - Shared types library.
//!
//! This crate provides common types used across all Prickly Pear components:
//! - `client` - Client-side identity & commerce-state core
//! - `integration-tests` - End-to-end flow tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Validated emails, user profiles, cart lines, and the
//!   password policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
