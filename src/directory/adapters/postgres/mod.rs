//! `PostgreSQL` read adapters for the user and organization directories.

mod models;
mod repository;
mod schema;

pub use repository::{DirectoryPgPool, PostgresDirectory};
