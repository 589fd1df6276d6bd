//! # voyage-common
//!
//! Shared types, configuration, error handling, and auth claims used across all Voyage crates.
//! This is the foundation layer: no storage access, just primitives and contracts.

pub mod any_row;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod validation;
