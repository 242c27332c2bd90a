//! User and organization directories consumed by the workflow engine and
//! the task dispatcher.
//!
//! The directories are owned by other parts of the platform. This module
//! only reads them:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
