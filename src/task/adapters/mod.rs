//! Adapter implementations of the task ports.

pub mod memory;
pub mod number;
pub mod postgres;
