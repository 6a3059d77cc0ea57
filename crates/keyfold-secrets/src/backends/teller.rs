//! Teller CLI backend
//!
//! Runs `teller export json` and reads the flat JSON object it prints.
//! Requires teller to be installed and already authenticated against its providers.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{ProviderKind, SecretsConfig};
use crate::error::SecretError;
use crate::process::{find_in_path, run_captured};
use crate::SecretNamespace;

/// Binary names tried, in order
pub const BINARY_CANDIDATES: &[&str] = &["teller", "teller-original"];

/// Something that can produce an already-merged namespace
pub trait ExportSource {
    fn export(&self) -> Result<SecretNamespace, SecretError>;
}

/// Locate the teller binary on `PATH`
pub fn find_binary() -> Result<PathBuf, SecretError> {
    for candidate in BINARY_CANDIDATES {
        if let Some(path) = find_in_path(candidate) {
            tracing::debug!(binary = %path.display(), "Found teller binary");
            return Ok(path);
        }
        tracing::debug!(candidate, "Binary not found");
    }
    Err(SecretError::CommandNotFound {
        program: "teller binary".to_string(),
        hint: format!("none of {} found in PATH", BINARY_CANDIDATES.join(", ")),
    })
}

/// `teller export json` invoked as a subprocess
#[derive(Debug, Clone)]
pub struct TellerCli {
    binary: PathBuf,
    config: Option<PathBuf>,
    verbose: bool,
}

impl TellerCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config: None,
            verbose: false,
        }
    }

    /// Find teller on `PATH`
    pub fn locate() -> Result<Self, SecretError> {
        find_binary().map(Self::new)
    }

    /// Forward `--config PATH`
    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    /// Forward `--verbose`
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Global flags followed by `rest`
    pub fn args<I, S>(&self, rest: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(config) = &self.config {
            args.push("--config".into());
            args.push(config.clone().into_os_string());
        }
        if self.verbose {
            args.push("--verbose".into());
        }
        args.extend(rest.into_iter().map(Into::into));
        args
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl ExportSource for TellerCli {
    fn export(&self) -> Result<SecretNamespace, SecretError> {
        let args = self.args(["export", "json"]);
        let output = run_captured(&self.binary, &args, "export secrets")?;
        tracing::debug!(bytes = output.stdout.len(), "Teller output received");
        parse_export(&output.stdout)
    }
}

/// Parse teller's flat JSON object of string values
pub fn parse_export(stdout: &[u8]) -> Result<SecretNamespace, SecretError> {
    serde_json::from_slice::<BTreeMap<String, String>>(stdout).map_err(|e| {
        SecretError::InvalidOutput {
            program: "teller".to_string(),
            message: e.to_string(),
        }
    })
}

/// Keep only the output keys bound by environment-backed providers, renamed back to
/// their source key (the name the secret carries in the cloud store).
pub fn remap_to_source_keys(config: &SecretsConfig, exported: SecretNamespace) -> SecretNamespace {
    let mut source_for_output: BTreeMap<&str, &str> = BTreeMap::new();
    for provider in config.providers_by_kind(ProviderKind::Environment) {
        for map in &provider.maps {
            for (source_key, output_key) in map.bindings() {
                source_for_output.insert(output_key, source_key);
            }
        }
    }

    let mut secrets = SecretNamespace::new();
    for (output_key, value) in exported {
        match source_for_output.get(output_key.as_str()) {
            Some(source_key) => {
                tracing::debug!(key = source_key, output = %output_key, "Including secret");
                secrets.insert(source_key.to_string(), value);
            }
            None => tracing::debug!(
                output = %output_key,
                "Skipping secret not bound by an environment provider"
            ),
        }
    }
    secrets
}
