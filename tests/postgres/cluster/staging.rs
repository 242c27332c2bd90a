//! Filesystem plumbing for the embedded cluster.

use super::BoxError;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use postgresql_embedded::Settings;
use std::io;
use std::sync::{Mutex, OnceLock, PoisonError};

static STAGED_WORKER: OnceLock<Mutex<Option<Utf8PathBuf>>> = OnceLock::new();

/// Copies `pg_worker` into the temp directory with world-executable mode.
///
/// The build directory is usually unreadable for `nobody`, the user the
/// worker demotes itself to. The copy is made once per test process.
pub(super) fn stage_worker(worker: &Utf8Path) -> Result<Utf8PathBuf, BoxError> {
    let slot = STAGED_WORKER.get_or_init(|| Mutex::new(None));
    let mut staged = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(path) = staged.as_ref() {
        return Ok(path.clone());
    }

    let temp = Utf8PathBuf::try_from(std::env::temp_dir())?;
    let name = format!("reunion_pg_worker_{}", std::process::id());
    let (source_dir, source_name) = parent_and_name(worker)?;
    let temp_dir = open_dir(&temp)?;
    match temp_dir.remove_file(&name) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err.into()),
        _ => {}
    }
    source_dir.copy(source_name, &temp_dir, &name)?;
    make_executable(&temp_dir, &name)?;

    let path = temp.join(name);
    *staged = Some(path.clone());
    Ok(path)
}

#[cfg(unix)]
fn make_executable(dir: &Dir, name: &str) -> Result<(), BoxError> {
    use cap_std::fs::{Permissions, PermissionsExt};

    dir.set_permissions(name, Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
const fn make_executable(_dir: &Dir, _name: &str) -> Result<(), BoxError> {
    Ok(())
}

/// Replaces the configured password with the generated one, if present.
pub(super) fn load_generated_password(settings: &mut Settings) -> Result<(), BoxError> {
    let path = Utf8PathBuf::try_from(settings.password_file.clone())?;
    let (dir, name) = parent_and_name(&path)?;
    let contents = match dir.read_to_string(name) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    let password = contents.trim_end();
    if !password.is_empty() {
        password.clone_into(&mut settings.password);
    }
    Ok(())
}

/// Reads the port the postmaster actually bound from `postmaster.pid`.
///
/// The fourth line of the pid file holds the port. A missing file or an
/// unparsable line leaves the settings untouched.
pub(super) fn adopt_running_port(settings: &mut Settings) -> Result<(), BoxError> {
    let data_dir = Utf8PathBuf::try_from(settings.data_dir.clone())?;
    let contents = match open_dir(&data_dir)?.read_to_string("postmaster.pid") {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    if let Some(port) = contents
        .lines()
        .nth(3)
        .and_then(|line| line.trim().parse::<u16>().ok())
    {
        settings.port = port;
    }
    Ok(())
}

fn open_dir(path: &Utf8Path) -> Result<Dir, BoxError> {
    Ok(Dir::open_ambient_dir(path, ambient_authority())?)
}

fn parent_and_name(path: &Utf8Path) -> Result<(Dir, &str), BoxError> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} has no file name")))?;
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    Ok((open_dir(parent)?, name))
}
