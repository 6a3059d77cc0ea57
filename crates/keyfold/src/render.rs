//! Output formats for a collected namespace
//!
//! Every renderer walks the namespace in key order, so output is stable
//! across runs.

use anyhow::{Context, Result};
use clap::ValueEnum;
use keyfold_secrets::SecretNamespace;

/// Format accepted by `keyfold export`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
    Env,
    Csv,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Env => "env",
            Format::Csv => "csv",
        }
    }
}

/// Render `secrets` in `format`
pub fn render(format: Format, secrets: &SecretNamespace) -> Result<String> {
    match format {
        Format::Json => {
            let mut out =
                serde_json::to_string_pretty(secrets).context("failed to encode secrets as JSON")?;
            out.push('\n');
            Ok(out)
        }
        Format::Yaml => serde_yaml::to_string(secrets).context("failed to encode secrets as YAML"),
        Format::Env => Ok(render_env(secrets)),
        Format::Csv => Ok(render_csv(secrets)),
    }
}

fn render_env(secrets: &SecretNamespace) -> String {
    secrets
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"\n", key, escape_env(value)))
        .collect()
}

fn escape_env(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn render_csv(secrets: &SecretNamespace) -> String {
    let mut out = String::from("key,value\n");
    for (key, value) in secrets {
        out.push_str(&format!("\"{}\",\"{}\"\n", key, value.replace('"', "\"\"")));
    }
    out
}

/// `export KEY='value'` lines for `eval` in a POSIX shell
pub fn render_shell(secrets: &SecretNamespace) -> String {
    secrets
        .iter()
        .map(|(key, value)| format!("export {}='{}'\n", key, value.replace('\'', "'\\''")))
        .collect()
}
