//! Reunion: coordination backend for volunteer search networks.
//!
//! This crate provides the approval workflows and the task dispatcher used
//! by volunteer organizations searching for missing people. Coordinators
//! route cases through configurable approval pipelines and hand field work
//! to volunteers, manually or by load-balanced automatic assignment.
//!
//! # Architecture
//!
//! Reunion follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`workflow`]: Approval workflow definitions and running instances
//! - [`task`]: Task creation, assignment and progress tracking
//! - [`directory`]: Read-only user and organization lookups
//! - [`config`]: TOML configuration
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod directory;
pub mod error;
mod ids;
pub mod paging;
pub mod task;
pub mod telemetry;
pub mod workflow;

pub use ids::ParseIdError;

#[cfg(test)]
mod test_support;
