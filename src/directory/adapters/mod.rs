//! Adapter implementations for directory lookups.

pub mod memory;
pub mod postgres;
