//! Embedded `PostgreSQL` cluster shared by the database tests.
//!
//! One cluster is bootstrapped per test process. A template database carries
//! the migrated schema and each test clones it into a throwaway database.

mod environment;
mod staging;

use self::environment::{bootstrap_overrides, to_overrides};
use self::staging::{adopt_running_port, load_generated_password};
use crate::test_helpers::ScopedEnv;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use pg_embedded_setup_unpriv::worker_process_test_api::{
    WorkerOperation, WorkerRequest, WorkerRequestArgs, run as run_worker,
};
use pg_embedded_setup_unpriv::{ExecutionPrivileges, TestBootstrapSettings, bootstrap_for_tests};
use postgresql_embedded::{PostgreSQL, Settings, Status};
use rstest::fixture;
use std::io;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared cluster handle handed to tests.
pub type PostgresCluster = &'static ManagedCluster;

const TEMPLATE_DATABASE: &str = "reunion_template";
const MIGRATIONS: [&str; 3] = [
    include_str!("../../../migrations/2025-03-01-000000_create_directory_tables/up.sql"),
    include_str!("../../../migrations/2025-03-01-000001_create_workflow_tables/up.sql"),
    include_str!("../../../migrations/2025-03-01-000002_create_task_tables/up.sql"),
];

static SHARED_CLUSTER: OnceLock<ManagedCluster> = OnceLock::new();
static CATALOG_LOCK: Mutex<()> = Mutex::new(());

/// Embedded cluster and the runtime that owns it, when started in process.
pub struct ManagedCluster {
    bootstrap: TestBootstrapSettings,
    environment: Vec<(String, Option<String>)>,
    in_process: Option<(Runtime, PostgreSQL)>,
}

impl ManagedCluster {
    fn boot() -> Result<Self, BoxError> {
        let overrides = bootstrap_overrides()?;
        let scoped = ScopedEnv::apply(&overrides);
        let mut bootstrap = bootstrap_for_tests()?;
        drop(scoped);
        load_generated_password(&mut bootstrap.settings)?;
        let environment = bootstrap.environment.to_env();
        let mut cluster = Self {
            bootstrap,
            environment,
            in_process: None,
        };
        match cluster.bootstrap.privileges {
            ExecutionPrivileges::Root => cluster.start_with_worker()?,
            ExecutionPrivileges::Unprivileged => cluster.start_in_process()?,
        }
        adopt_running_port(&mut cluster.bootstrap.settings)?;
        Ok(cluster)
    }

    fn start_in_process(&mut self) -> Result<(), BoxError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let scoped = ScopedEnv::apply(&to_overrides(&self.environment));
        let mut postgres = PostgreSQL::new(self.bootstrap.settings.clone());
        runtime.block_on(async {
            postgres.setup().await?;
            if !matches!(postgres.status(), Status::Started) {
                postgres.start().await?;
            }
            Ok::<(), postgresql_embedded::Error>(())
        })?;
        drop(scoped);
        self.bootstrap.settings = postgres.settings().clone();
        self.in_process = Some((runtime, postgres));
        Ok(())
    }

    fn start_with_worker(&self) -> Result<(), BoxError> {
        self.worker(WorkerOperation::Setup, self.bootstrap.setup_timeout)?;
        self.worker(WorkerOperation::Start, self.bootstrap.start_timeout)
    }

    fn worker(&self, operation: WorkerOperation, timeout: Duration) -> Result<(), BoxError> {
        let worker = self.bootstrap.worker_binary.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "PG_EMBEDDED_WORKER is not set")
        })?;
        let request = WorkerRequest::new(WorkerRequestArgs {
            worker: worker.as_path(),
            settings: &self.bootstrap.settings,
            env_vars: &self.environment,
            operation,
            timeout,
        });
        run_worker(&request)?;
        Ok(())
    }

    fn settings(&self) -> &Settings {
        &self.bootstrap.settings
    }

    /// Connection URL for `database` on this cluster.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        self.settings().url(database)
    }

    /// Creates a fresh database holding the migrated schema.
    ///
    /// # Errors
    ///
    /// Returns an error when the template cannot be built or cloned.
    pub fn temporary_database(&'static self) -> Result<TemporaryDatabase, BoxError> {
        let name = format!("reunion_test_{}", Uuid::new_v4().simple());
        let _catalog = CATALOG_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_template()?;
        self.admin_sql(&format!(
            "CREATE DATABASE {} TEMPLATE {}",
            quote_identifier(&name),
            quote_identifier(TEMPLATE_DATABASE),
        ))?;
        Ok(TemporaryDatabase {
            cluster: self,
            name,
        })
    }

    fn ensure_template(&self) -> Result<(), BoxError> {
        if self.database_exists(TEMPLATE_DATABASE)? {
            return Ok(());
        }
        self.admin_sql(&format!(
            "CREATE DATABASE {}",
            quote_identifier(TEMPLATE_DATABASE)
        ))?;
        if let Err(err) = self.migrate(TEMPLATE_DATABASE) {
            self.admin_sql(&format!(
                "DROP DATABASE {}",
                quote_identifier(TEMPLATE_DATABASE)
            ))?;
            return Err(err);
        }
        Ok(())
    }

    fn migrate(&self, database: &str) -> Result<(), BoxError> {
        let mut connection = PgConnection::establish(&self.url(database))?;
        for migration in MIGRATIONS {
            connection.batch_execute(migration)?;
        }
        Ok(())
    }

    fn admin_sql(&self, sql: &str) -> Result<(), BoxError> {
        let mut connection = PgConnection::establish(&self.url("postgres"))?;
        diesel::sql_query(sql).execute(&mut connection)?;
        Ok(())
    }

    fn database_exists(&self, database: &str) -> Result<bool, BoxError> {
        #[derive(diesel::QueryableByName)]
        struct Found {
            #[diesel(sql_type = diesel::sql_types::Bool)]
            found: bool,
        }

        let mut connection = PgConnection::establish(&self.url("postgres"))?;
        let row = diesel::sql_query(
            "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1) AS found",
        )
        .bind::<diesel::sql_types::Text, _>(database)
        .get_result::<Found>(&mut connection)?;
        Ok(row.found)
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        if let Some((runtime, postgres)) = self.in_process.take() {
            runtime.block_on(postgres.stop())?;
            return Ok(());
        }
        if matches!(self.bootstrap.privileges, ExecutionPrivileges::Root) {
            self.worker(WorkerOperation::Stop, self.bootstrap.shutdown_timeout)?;
        }
        Ok(())
    }
}

impl Drop for ManagedCluster {
    fn drop(&mut self) {
        drop(self.stop());
    }
}

/// Database cloned from the template, dropped with the value.
pub struct TemporaryDatabase {
    cluster: PostgresCluster,
    name: String,
}

impl TemporaryDatabase {
    /// Connection URL for this database.
    #[must_use]
    pub fn url(&self) -> String {
        self.cluster.url(&self.name)
    }
}

impl Drop for TemporaryDatabase {
    fn drop(&mut self) {
        drop(self.cluster.admin_sql(&format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(&self.name)
        )));
    }
}

/// Provides the shared cluster, booting it on first use.
///
/// Booting happens on a plain thread so the in-process runtime never nests
/// inside the test's own runtime.
#[fixture]
pub fn postgres_cluster() -> PostgresCluster {
    SHARED_CLUSTER.get_or_init(|| {
        let booted = std::thread::spawn(|| ManagedCluster::boot().map_err(|err| err.to_string()))
            .join()
            .unwrap_or_else(|_| Err("cluster bootstrap thread panicked".to_owned()));
        match booted {
            Ok(cluster) => cluster,
            Err(err) => panic!("SKIP-TEST-CLUSTER: failed to start PostgreSQL: {err}"),
        }
    })
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
