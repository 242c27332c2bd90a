//! Locates the `pg_worker` executable for root-run cluster tests.

use camino::Utf8PathBuf;
use std::env;
use std::ffi::OsString;

const WORKER_NAME: &str = if cfg!(windows) {
    "pg_worker.exe"
} else {
    "pg_worker"
};

/// Finds `pg_worker`, preferring the binary Cargo built for this test run.
///
/// Falls back to an explicit `PG_EMBEDDED_WORKER`, the target directory next
/// to the test executable, and finally `PATH`.
pub fn find_pg_worker() -> Option<Utf8PathBuf> {
    env::var_os("CARGO_BIN_EXE_pg_worker")
        .and_then(utf8)
        .or_else(from_worker_variable)
        .or_else(beside_test_binary)
        .or_else(on_search_path)
}

fn from_worker_variable() -> Option<Utf8PathBuf> {
    let path = env::var_os("PG_EMBEDDED_WORKER").and_then(utf8)?;
    (path.file_stem() == Some("pg_worker") && path.is_file()).then_some(path)
}

fn beside_test_binary() -> Option<Utf8PathBuf> {
    let test_binary = env::current_exe().ok().map(OsString::from).and_then(utf8)?;
    let profile_dir = test_binary.parent()?.parent()?;
    let candidate = profile_dir.join(WORKER_NAME);
    candidate.is_file().then_some(candidate)
}

fn on_search_path() -> Option<Utf8PathBuf> {
    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .filter_map(|dir| utf8(dir.into_os_string()))
        .map(|dir| dir.join(WORKER_NAME))
        .find(|candidate| candidate.is_file())
}

fn utf8(value: OsString) -> Option<Utf8PathBuf> {
    value.into_string().ok().map(Utf8PathBuf::from)
}
