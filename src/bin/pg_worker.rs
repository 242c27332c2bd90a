//! Drives an embedded `PostgreSQL` cluster on behalf of a root test runner.
//!
//! Usage:
//!
//! ```text
//! pg_worker <setup|start|stop> <payload-path>
//! ```
//!
//! The payload is the JSON worker description written by
//! `pg-embed-setup-unpriv`: cluster settings plus environment overrides. When
//! started as root the worker re-executes itself as `nobody` before touching
//! the data directory, because `initdb` and `postgres` refuse to run as root.

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    use clap::Parser;

    let args = unix::WorkerArgs::parse();
    unix::demote_by_reexec(&args)?;
    unix::run(&args).map_err(Into::into)
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker only runs on Unix hosts".into())
}

#[cfg(unix)]
mod unix {
    use camino::{Utf8Path, Utf8PathBuf};
    use clap::{Parser, ValueEnum};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;
    use tokio::runtime::Builder;

    const REEXEC_MARKER: &str = "REUNION_PG_WORKER_DEMOTED";
    const SAFE_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    pub(crate) enum WorkerError {
        #[error("failed to read worker payload: {0}")]
        PayloadRead(#[source] super::BoxError),
        #[error("failed to parse worker payload: {0}")]
        PayloadParse(#[source] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("runtime init failed: {0}")]
        RuntimeInit(#[source] io::Error),
        #[error("failed to drop privileges: {0}")]
        Demotion(String),
        #[error("cluster {operation} failed: {message}")]
        Cluster {
            operation: &'static str,
            message: String,
        },
    }

    /// Lifecycle step requested by the test harness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    pub(crate) enum ClusterOperation {
        Setup,
        Start,
        Stop,
    }

    impl ClusterOperation {
        pub(crate) const fn as_str(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    #[derive(Debug, Parser)]
    #[command(name = "pg_worker", about = "Embedded PostgreSQL lifecycle worker")]
    pub(crate) struct WorkerArgs {
        /// Lifecycle step to perform.
        #[arg(value_enum)]
        pub(crate) operation: ClusterOperation,
        /// JSON payload describing the cluster.
        pub(crate) payload: Utf8PathBuf,
    }

    pub(crate) fn run(args: &WorkerArgs) -> Result<(), WorkerError> {
        let operation = args.operation;
        let description = read_payload(&args.payload)?;
        drop_root_privileges()?;
        let settings = description
            .settings
            .into_settings()
            .map_err(|err| WorkerError::Settings(err.to_string()))?;
        apply_environment(&description.environment);

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::RuntimeInit)?;
        let mut postgres = PostgreSQL::new(settings);
        runtime.block_on(async {
            match operation {
                ClusterOperation::Setup => {
                    postgres
                        .setup()
                        .await
                        .map_err(|err| cluster_failure(operation, &err))?;
                    start_if_stopped(&mut postgres).await
                }
                ClusterOperation::Start => start_if_stopped(&mut postgres).await,
                ClusterOperation::Stop => postgres
                    .stop()
                    .await
                    .map_err(|err| cluster_failure(operation, &err)),
            }
        })?;

        if operation != ClusterOperation::Stop {
            // The server must outlive this process; dropping the handle stops it.
            std::mem::forget(postgres);
        }
        Ok(())
    }

    async fn start_if_stopped(postgres: &mut PostgreSQL) -> Result<(), WorkerError> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres
            .start()
            .await
            .map_err(|err| cluster_failure(ClusterOperation::Start, &err))
    }

    fn cluster_failure(operation: ClusterOperation, err: &impl ToString) -> WorkerError {
        WorkerError::Cluster {
            operation: operation.as_str(),
            message: err.to_string(),
        }
    }

    fn read_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
        let bytes = read_bytes(path).map_err(WorkerError::PayloadRead)?;
        serde_json::from_slice(&bytes).map_err(WorkerError::PayloadParse)
    }

    fn read_bytes(path: &Utf8Path) -> Result<Vec<u8>, super::BoxError> {
        let (dir, relative) = ambient_dir_and_path(path)?;
        let mut file = dir.open(relative.as_std_path())?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Re-runs the worker as an unprivileged user and exits with its status.
    ///
    /// Returns immediately when the process is not root or has already been
    /// re-executed.
    pub(crate) fn demote_by_reexec(args: &WorkerArgs) -> Result<(), WorkerError> {
        if !Uid::effective().is_root() || env::var_os(REEXEC_MARKER).is_some() {
            return Ok(());
        }

        let exe = env::current_exe()
            .map_err(WorkerError::RuntimeInit)?
            .into_os_string()
            .into_string()
            .map(Utf8PathBuf::from)
            .map_err(|_| {
                WorkerError::RuntimeInit(io::Error::other("executable path is not valid UTF-8"))
            })?;
        let forwarded = [args.operation.as_str(), args.payload.as_str()];
        let status = match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(exe.as_std_path())
            .args(forwarded)
            .env(REEXEC_MARKER, "1")
            .env("PATH", SAFE_PATH)
            .status()
        {
            Ok(status) => status,
            Err(err) if err.kind() == io::ErrorKind::NotFound => reexec_with_su(&exe, &forwarded)?,
            Err(err) => return Err(WorkerError::Demotion(err.to_string())),
        };
        std::process::exit(status.code().unwrap_or(1));
    }

    fn reexec_with_su(exe: &Utf8Path, forwarded: &[&str]) -> Result<ExitStatus, WorkerError> {
        let script = std::iter::once(exe.as_str())
            .chain(forwarded.iter().copied())
            .map(quote_for_shell)
            .fold(format!("{REEXEC_MARKER}=1 exec"), |mut line, word| {
                line.push(' ');
                line.push_str(&word);
                line
            });
        Command::new("/bin/su")
            .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
            .arg(script)
            .env("PATH", SAFE_PATH)
            .status()
            .map_err(|err| WorkerError::Demotion(err.to_string()))
    }

    /// Wraps `value` in single quotes for `/bin/sh`.
    pub(crate) fn quote_for_shell(value: &str) -> String {
        format!("'{}'", value.replace('\'', r"'\''"))
    }

    fn drop_root_privileges() -> Result<(), WorkerError> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(|err| WorkerError::Demotion(err.to_string()))?
            .ok_or_else(|| WorkerError::Demotion(format!("user '{UNPRIVILEGED_USER}' not found")))?;
        let name = CString::new(user.name.as_str())
            .map_err(|err| WorkerError::Demotion(err.to_string()))?;
        initgroups(&name, user.gid).map_err(|err| WorkerError::Demotion(err.to_string()))?;
        setgid(user.gid).map_err(|err| WorkerError::Demotion(err.to_string()))?;
        setuid(user.uid).map_err(|err| WorkerError::Demotion(err.to_string()))?;

        // SAFETY: the worker is single-threaded until the runtime is built.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: the worker is single-threaded until the runtime is built.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
