//! Outside GitHub Actions, secret-consuming commands are handed to teller itself

use std::ffi::OsString;
use std::process::Command;

use anyhow::{Context, Result};
use keyfold_secrets::backends::teller::TellerCli;

use crate::GlobalArgs;

/// True when running inside a GitHub Actions job
pub fn in_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").as_deref() == Ok("true")
}

/// Run teller with `args`, inheriting stdio, and return its exit code
pub fn delegate(global: &GlobalArgs, args: Vec<OsString>) -> Result<i32> {
    let teller = TellerCli::locate()?
        .with_config(global.config.clone())
        .with_verbose(global.verbose);
    let argv = teller.args(args);

    tracing::debug!(binary = %teller.binary().display(), ?argv, "Delegating to teller");

    let status = Command::new(teller.binary())
        .args(&argv)
        .status()
        .with_context(|| format!("failed to run {}", teller.binary().display()))?;

    Ok(status.code().unwrap_or(1))
}
