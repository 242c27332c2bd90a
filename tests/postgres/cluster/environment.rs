//! Environment overrides applied while bootstrapping the test cluster.

use super::BoxError;
use super::staging::stage_worker;
use crate::test_helpers::find_pg_worker;
use pg_embedded_setup_unpriv::{ExecutionPrivileges, detect_execution_privileges};
use std::ffi::OsString;
use std::io;
use std::net::TcpListener;

/// Owned environment change; `None` unsets the variable.
pub(super) type Override = (OsString, Option<OsString>);

/// Overrides needed before `bootstrap_for_tests` reads the environment.
///
/// A free port is chosen unless `PG_PORT` is already set. Root runners also
/// need `PG_EMBEDDED_WORKER` pointing at a copy of `pg_worker` that the
/// unprivileged user can execute.
pub(super) fn bootstrap_overrides() -> Result<Vec<Override>, BoxError> {
    let mut overrides = Vec::new();
    if std::env::var_os("PG_PORT").is_none() {
        overrides.push((OsString::from("PG_PORT"), Some(free_port()?)));
    }

    let needs_worker = matches!(detect_execution_privileges(), ExecutionPrivileges::Root)
        && std::env::var_os("PG_EMBEDDED_WORKER").is_none();
    if needs_worker {
        let worker = find_pg_worker().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "running as root but no pg_worker binary was found",
            )
        })?;
        let staged = stage_worker(&worker)?;
        overrides.push((
            OsString::from("PG_EMBEDDED_WORKER"),
            Some(OsString::from(staged.into_string())),
        ));
    }
    Ok(overrides)
}

/// Converts the bootstrap's string environment into owned OS overrides.
pub(super) fn to_overrides(vars: &[(String, Option<String>)]) -> Vec<Override> {
    vars.iter()
        .map(|(key, value)| (OsString::from(key), value.clone().map(OsString::from)))
        .collect()
}

fn free_port() -> Result<OsString, BoxError> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    Ok(OsString::from(port.to_string()))
}
