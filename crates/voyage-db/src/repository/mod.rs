//! Repository layer: query functions organized by table.

pub mod follows;
pub mod vacations;
