//! Step definitions for automatic assignment scenarios.

pub mod given;
pub mod when;
pub mod world;
