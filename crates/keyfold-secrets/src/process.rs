//! Helpers for the collaborator CLIs

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::SecretError;

/// Locate an executable on `PATH`
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Run `program args...`, capturing output and failing on a non-zero exit.
///
/// Stderr is logged at debug level only; it is left out of the error message.
pub fn run_captured<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    action: &str,
) -> Result<Output, SecretError> {
    let name = program.display().to_string();
    tracing::debug!(program = %name, action, "Executing collaborator");

    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SecretError::CommandNotFound {
                program: name.clone(),
                hint: "is it installed and on PATH?".to_string(),
            }
        } else {
            SecretError::command(&name, action, e.to_string())
        }
    })?;

    if !output.status.success() {
        tracing::debug!(
            program = %name,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Collaborator failed"
        );
        return Err(SecretError::command(&name, action, output.status.to_string()));
    }

    Ok(output)
}
