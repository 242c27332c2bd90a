//! Runs one automatic assignment pass for an organization.
//!
//! Usage:
//!
//! ```text
//! auto_assign --org <organization-id> [--limit <n>] [--config <path>]
//! ```
//!
//! Pending tasks of the organization are handed, most urgent first, to the
//! member with the smallest active workload. The outcome is written to the
//! log; the process exits non-zero only when the pass could not run.

use clap::Parser;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use mockable::DefaultClock;
use reunion::config::{ConfigError, ReunionConfig};
use reunion::directory::{adapters::postgres::PostgresDirectory, domain::OrganizationId};
use reunion::task::{
    adapters::{number::RandomTaskNumberGenerator, postgres::PostgresTaskRepository},
    services::{TaskDispatchError, TaskDispatchService},
};
use reunion::telemetry::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::util::TryInitError;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "auto_assign", about = "Assign pending tasks to organization members")]
struct Args {
    /// Configuration file.
    #[arg(long, env = "REUNION_CONFIG", default_value = "reunion.toml")]
    config: PathBuf,
    /// Organization whose pending tasks are assigned.
    #[arg(long)]
    org: OrganizationId,
    /// Largest number of tasks drawn; defaults to `dispatch.auto_assign_limit`.
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Debug, Error)]
enum AutoAssignError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to install log subscriber: {0}")]
    Telemetry(#[from] TryInitError),
    #[error("failed to build connection pool: {0}")]
    Pool(#[from] PoolError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] TaskDispatchError),
}

fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    run(args).map_err(Into::into)
}

fn run(args: Args) -> Result<(), AutoAssignError> {
    let Args { config, org, limit } = args;
    let settings = ReunionConfig::load(&config)?;
    init_tracing(&settings.logging)?;

    let manager = ConnectionManager::<PgConnection>::new(settings.database.url.as_str());
    let pool = Pool::builder()
        .max_size(settings.database.max_connections)
        .build(manager)?;
    let directory = Arc::new(PostgresDirectory::new(pool.clone()));
    let service = TaskDispatchService::new(
        Arc::new(PostgresTaskRepository::new(pool)),
        Arc::clone(&directory),
        directory,
        Arc::new(RandomTaskNumberGenerator::new(
            settings.dispatch.task_number_prefix.as_str(),
        )),
        Arc::new(DefaultClock),
    )
    .with_number_attempts(settings.dispatch.task_number_attempts);
    let batch = limit.unwrap_or(settings.dispatch.auto_assign_limit);

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AutoAssignError::RuntimeInit)?;
    let report = runtime.block_on(service.auto_assign_tasks(org, batch))?;

    for assignment in &report.assigned {
        info!(
            task_id = %assignment.task_id,
            assignee_id = %assignment.assignee_id,
            "task assigned"
        );
    }
    for task_id in &report.skipped {
        warn!(task_id = %task_id, "task left pending");
    }
    info!(
        org_id = %org,
        assigned = report.assigned.len(),
        skipped = report.skipped.len(),
        "auto-assignment pass complete"
    );
    Ok(())
}
