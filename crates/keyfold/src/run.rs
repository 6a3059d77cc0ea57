//! Running a child process with the collected secrets in its environment

use std::ffi::OsString;
use std::process::Command;

use anyhow::{Context, Result};
use keyfold_secrets::SecretNamespace;

const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Start from an empty environment instead of inheriting ours
    pub reset: bool,
    /// Hand the joined command line to a shell
    pub shell: bool,
}

/// The shell used for `--shell`: `$SHELL`, falling back to `/bin/sh`
pub fn user_shell() -> OsString {
    std::env::var_os("SHELL")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| OsString::from(DEFAULT_SHELL))
}

/// Build the child command. `command` must not be empty.
pub fn build_command(
    command: &[String],
    secrets: &SecretNamespace,
    options: RunOptions,
    shell: impl Into<OsString>,
) -> Result<Command> {
    let (program, args) = command
        .split_first()
        .context("no command given to run")?;

    let mut cmd = if options.shell {
        let mut cmd = Command::new(shell.into());
        cmd.arg("-c").arg(command.join(" "));
        cmd
    } else {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    };

    if options.reset {
        cmd.env_clear();
    }
    cmd.envs(secrets);
    Ok(cmd)
}

/// Run `command` to completion and return its exit code
pub fn execute(command: &[String], secrets: &SecretNamespace, options: RunOptions) -> Result<i32> {
    let mut cmd = build_command(command, secrets, options, user_shell())?;

    tracing::debug!(
        program = ?cmd.get_program(),
        secrets = secrets.len(),
        reset = options.reset,
        "Running command"
    );

    let status = cmd
        .status()
        .with_context(|| format!("failed to run '{}'", command.join(" ")))?;

    // Killed by a signal: no code
    Ok(status.code().unwrap_or(1))
}
