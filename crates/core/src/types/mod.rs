//! Core types for ChinChin.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! entity records exchanged with the storefront backend.

pub mod blog;
pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod price;
pub mod profile;

pub use blog::{Post, PostCategory};
pub use cart::{Cart, CartItem};
pub use catalog::{Category, Product};
pub use email::{Email, EmailError};
pub use id::EntityId;
pub use price::Price;
pub use profile::{UserProfile, UserRole};
