//! API route modules.

pub mod follows;
pub mod health;
pub mod images;
pub mod stats;
pub mod users;
pub mod vacations;
