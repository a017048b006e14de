//! Database query functions organized by table.

pub mod clips;
pub mod metadata;
