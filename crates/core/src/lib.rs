//! DeskOps Core - Shared domain types.
//!
//! This crate provides the types used across all DeskOps components:
//! - `server` - JSON back-office API (tickets, planning, integrations)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, ticket/order statuses and tombstones

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
