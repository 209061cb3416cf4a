//! API handlers module

pub mod catalog;
pub mod documents;
pub mod health;
pub mod lookups;
pub mod records;
