//! ChinChin Core - Shared types library.
//!
//! This crate provides the domain types used across the ChinChin components:
//! - `client` - Authenticated REST client with token refresh and cache mirror
//! - `cli` - Command-line front end for catalog, blog, cart and session commands
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Entity ids, prices, emails, roles and the catalog/blog/cart records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
