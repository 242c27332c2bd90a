//! Approval workflow engine.
//!
//! Definitions are named, versioned pipelines of ordered steps. Instances
//! bind a definition to one business object and advance step by step
//! through approve, reject, transfer and cancel transitions, each of which
//! appends one immutable history row. The module follows hexagonal
//! architecture:
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
