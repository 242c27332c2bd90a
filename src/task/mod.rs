//! Task dispatch: creation, assignment, completion and tracking of field
//! work such as searches, calls and record collection.
//!
//! Every state change is written together with an append-only log row.
//! Tasks are independent of workflow instances; the optional workflow link
//! on a task is stored and returned but never advanced here.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
