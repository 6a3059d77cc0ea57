//! File-backed provider adapter (`KEY=VALUE` files)

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ProviderSpec;
use crate::error::SecretError;
use crate::mask::mask_secret;
use crate::SecretNamespace;

/// Collect secrets from every field map of a file-backed provider.
///
/// With bindings, only bound keys are carried over under their output key and
/// keys absent from the file are silently omitted. Without bindings every
/// parsed key passes through unchanged.
pub fn collect(spec: &ProviderSpec) -> Result<SecretNamespace, SecretError> {
    let mut secrets = SecretNamespace::new();

    for map in &spec.maps {
        let entries = load(&map.path)?;
        tracing::debug!(
            provider = %spec.name,
            map = %map.id,
            path = %map.path.display(),
            entries = entries.len(),
            "Loaded env file"
        );

        if map.is_discovery() {
            secrets.extend(entries);
            continue;
        }

        for (source_key, output_key) in map.bindings() {
            match entries.get(source_key) {
                Some(value) => {
                    secrets.insert(output_key.to_string(), value.clone());
                }
                None => tracing::debug!(
                    provider = %spec.name,
                    key = source_key,
                    path = %map.path.display(),
                    "Key not found in env file"
                ),
            }
        }
    }

    Ok(secrets)
}

/// Read and parse one env file
pub fn load(path: &Path) -> Result<BTreeMap<String, String>, SecretError> {
    let content = std::fs::read_to_string(path).map_err(|e| SecretError::FileError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(parse(&content))
}

/// Parse `KEY=VALUE` lines. Blank lines, `#` comments and lines without `=` are skipped.
pub fn parse(content: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!(line = number + 1, "Skipping malformed line");
            continue;
        };

        let key = key.trim();
        let value = unquote(value.trim());
        tracing::trace!(line = number + 1, key, value = %mask_secret(value), "Parsed line");
        entries.insert(key.to_string(), value.to_string());
    }

    entries
}

/// Strip one matching pair of surrounding single or double quotes
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
