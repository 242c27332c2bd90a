//! Adapter implementations for workflow persistence.

pub mod memory;
pub mod postgres;
