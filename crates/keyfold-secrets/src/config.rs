//! Provider configuration
//!
//! Loads `.teller.yml`-style documents (YAML, or TOML when the file ends in `.toml`):
//!
//! ```yaml
//! providers:
//!   cloud:
//!     kind: google_secretmanager   # or `environment`
//!     maps:
//!       - id: app
//!         path: projects/acme/secrets
//!         keys:
//!           DATABASE_URL: DB_URL
//!   local:
//!     kind: dotenv                 # or `file`
//!     maps:
//!       - id: overrides
//!         path: ./.env.local       # no `keys`: every key in the file is passed through
//! ```
//!
//! Provider and key declaration order is preserved, so merging is reproducible.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::SecretError;

/// File names probed in each directory when no explicit config path is given
pub const CONFIG_FILE_NAMES: &[&str] = &[".teller.yml", ".teller.yaml", ".keyfold.toml"];

/// Which adapter reads a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Values are read from the process environment
    Environment,
    /// Values are read from `KEY=VALUE` files
    File,
}

impl ProviderKind {
    /// Map a declared `kind` string, accepting the teller names as aliases
    pub fn from_declared(kind: &str) -> Option<Self> {
        match kind {
            "environment" | "google_secretmanager" => Some(Self::Environment),
            "file" | "dotenv" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration of which source keys map to which output keys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMap {
    pub id: String,
    /// Source file, only meaningful for file-backed providers
    pub path: PathBuf,
    /// `(source_key, output_key)` pairs in declaration order. Empty means discovery mode.
    pub keys: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            keys: Vec::new(),
        }
    }

    /// Add a binding, replacing an earlier binding of the same source key
    pub fn bind(mut self, source_key: impl Into<String>, output_key: impl Into<String>) -> Self {
        let source_key = source_key.into();
        let output_key = output_key.into();
        match self.keys.iter_mut().find(|(s, _)| *s == source_key) {
            Some(entry) => entry.1 = output_key,
            None => self.keys.push((source_key, output_key)),
        }
        self
    }

    /// True when no bindings are declared
    pub fn is_discovery(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(|(s, o)| (s.as_str(), o.as_str()))
    }
}

/// A declared secret source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub kind: ProviderKind,
    pub maps: Vec<FieldMap>,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, kind: ProviderKind, maps: Vec<FieldMap>) -> Self {
        Self {
            name: name.into(),
            kind,
            maps,
        }
    }
}

/// Parsed configuration: providers in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsConfig {
    pub providers: Vec<ProviderSpec>,
}

/// Document syntax, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl SecretsConfig {
    pub fn new(providers: Vec<ProviderSpec>) -> Self {
        Self { providers }
    }

    /// Load from an explicit path, or search upward from the working directory
    pub fn load(explicit: Option<&Path>) -> Result<Self, SecretError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                tracing::debug!("No config path provided, searching upwards");
                let cwd = std::env::current_dir().map_err(|e| SecretError::config_read(".", e))?;
                Self::find(&cwd)?
            }
        };
        Self::load_from(&path)
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, SecretError> {
        tracing::debug!(path = %path.display(), "Loading configuration");
        let content =
            std::fs::read_to_string(path).map_err(|e| SecretError::config_read(path, e))?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .map_err(|reason| SecretError::config_parse(path, reason))?;

        tracing::debug!(providers = config.providers.len(), "Parsed configuration");
        for provider in &config.providers {
            tracing::debug!(
                provider = %provider.name,
                kind = %provider.kind,
                maps = provider.maps.len(),
                "Provider declared"
            );
        }
        Ok(config)
    }

    /// Walk from `start` up to the filesystem root looking for a config file
    pub fn find(start: &Path) -> Result<PathBuf, SecretError> {
        for dir in start.ancestors() {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "Found config file");
                    return Ok(candidate);
                }
            }
        }
        Err(SecretError::ConfigNotFound {
            names: CONFIG_FILE_NAMES.join(", "),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, SecretError> {
        Self::parse(content, ConfigFormat::Yaml)
            .map_err(|reason| SecretError::config_parse("<inline>", reason))
    }

    pub fn from_toml(content: &str) -> Result<Self, SecretError> {
        Self::parse(content, ConfigFormat::Toml)
            .map_err(|reason| SecretError::config_parse("<inline>", reason))
    }

    fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
        };

        let mut providers = Vec::new();
        for (name, provider) in raw.providers.unwrap_or_default().0 {
            let Some(kind) = ProviderKind::from_declared(&provider.kind) else {
                tracing::warn!(
                    provider = %name,
                    kind = %provider.kind,
                    "Unsupported provider kind, ignoring"
                );
                continue;
            };

            let maps = provider
                .maps
                .into_iter()
                .map(|map| FieldMap {
                    id: map.id,
                    path: PathBuf::from(shellexpand::tilde(&map.path).as_ref()),
                    keys: map.keys.unwrap_or_default().0,
                })
                .collect();

            providers.push(ProviderSpec { name, kind, maps });
        }

        Ok(Self { providers })
    }

    /// Providers of one kind, in declaration order
    pub fn providers_by_kind(&self, kind: ProviderKind) -> impl Iterator<Item = &ProviderSpec> {
        self.providers.iter().filter(move |p| p.kind == kind)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    providers: Option<OrderedMap<RawProvider>>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    kind: String,
    #[serde(default)]
    maps: Vec<RawFieldMap>,
}

#[derive(Debug, Deserialize)]
struct RawFieldMap {
    #[serde(default)]
    id: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    keys: Option<OrderedMap<String>>,
}

/// A mapping deserialized in document order, rejecting duplicate keys
#[derive(Debug)]
struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, V)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    if entries.iter().any(|(existing, _)| *existing == key) {
                        return Err(de::Error::custom(format!("duplicate key '{}'", key)));
                    }
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
providers:
  cloud:
    kind: google_secretmanager
    maps:
      - id: app
        path: projects/acme/secrets
        keys:
          ZETA: Z_OUT
          ALPHA: A_OUT
  local:
    kind: dotenv
    options:
      anything: goes
    maps:
      - id: overrides
        path: ./.env.local
  vault:
    kind: hashicorp_vault
    maps:
      - id: ignored
        path: secret/data/app
"#;

    #[test]
    fn test_parse_yaml_keeps_declaration_order() {
        let config = SecretsConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.providers.len(), 2);

        let cloud = &config.providers[0];
        assert_eq!(cloud.name, "cloud");
        assert_eq!(cloud.kind, ProviderKind::Environment);
        assert_eq!(
            cloud.maps[0].keys,
            vec![
                ("ZETA".to_string(), "Z_OUT".to_string()),
                ("ALPHA".to_string(), "A_OUT".to_string()),
            ]
        );

        let local = &config.providers[1];
        assert_eq!(local.kind, ProviderKind::File);
        assert!(local.maps[0].is_discovery());
        assert_eq!(local.maps[0].path, PathBuf::from("./.env.local"));
    }

    #[test]
    fn test_parse_toml() {
        let config = SecretsConfig::from_toml(
            r#"
[providers.env]
kind = "environment"

[[providers.env.maps]]
id = "ci"
path = ""
keys = { GH_TOKEN = "GITHUB_TOKEN" }
"#,
        )
        .unwrap();

        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].kind, ProviderKind::Environment);
        assert_eq!(
            config.providers[0].maps[0].bindings().collect::<Vec<_>>(),
            vec![("GH_TOKEN", "GITHUB_TOKEN")]
        );
    }

    #[test]
    fn test_parse_toml_keeps_declaration_order() {
        let config = SecretsConfig::from_toml(
            r#"
[providers.zeta]
kind = "environment"

[[providers.zeta.maps]]
id = "z"
keys = { ZZ = "X", AA = "Y" }

[providers.alpha]
kind = "environment"

[[providers.alpha.maps]]
id = "a"
keys = { BB = "X" }
"#,
        )
        .unwrap();

        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(
            config.providers[0].maps[0].bindings().collect::<Vec<_>>(),
            vec![("ZZ", "X"), ("AA", "Y")]
        );

        let env: std::collections::HashMap<String, String> = [
            ("ZZ".to_string(), "from-zeta".to_string()),
            ("BB".to_string(), "from-alpha".to_string()),
        ]
        .into_iter()
        .collect();
        let outcome = crate::Collector::with_env(env)
            .collect_config(&config)
            .unwrap();
        assert_eq!(outcome.secrets()["X"], "from-alpha");
    }

    #[test]
    fn test_empty_document_has_no_providers() {
        let config = SecretsConfig::from_yaml("  \n").unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_duplicate_source_key_rejected() {
        let result = SecretsConfig::from_yaml(
            r#"
providers:
  p:
    kind: environment
    maps:
      - id: m
        keys:
          A: X
          A: Y
"#,
        );
        assert!(matches!(result, Err(SecretError::Config { .. })));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = SecretsConfig::from_yaml("invalid: yaml: content: [");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SecretsConfig::load_from(Path::new("/nonexistent/path/teller.yml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_find_searches_parent_directories() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let mut file = std::fs::File::create(root.path().join(".teller.yml")).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let found = SecretsConfig::find(&nested).unwrap();
        assert_eq!(found, root.path().join(".teller.yml"));

        let config = SecretsConfig::load_from(&found).unwrap();
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn test_providers_by_kind() {
        let config = SecretsConfig::from_yaml(SAMPLE).unwrap();
        let names: Vec<_> = config
            .providers_by_kind(ProviderKind::File)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["local"]);
    }

    #[test]
    fn test_field_map_bind_replaces_source_key() {
        let map = FieldMap::new("m", "").bind("A", "X").bind("B", "Y").bind("A", "Z");
        assert_eq!(map.bindings().collect::<Vec<_>>(), vec![("A", "Z"), ("B", "Y")]);
        assert!(!map.is_discovery());
    }
}
