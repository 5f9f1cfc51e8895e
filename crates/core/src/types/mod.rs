//! Core types for DeskOps.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod role;
pub mod status;
pub mod tombstone;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::OrderStatus;
pub use role::Role;
pub use status::*;
pub use tombstone::{is_tombstone, tombstone_email};
