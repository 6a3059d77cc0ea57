//! Multi-provider collection and merge

use crate::backends::env::{EnvSource, ProcessEnv};
use crate::config::{ProviderKind, ProviderSpec, SecretsConfig};
use crate::error::SecretError;
use crate::mask::mask_secret;
use crate::{backends, SecretNamespace};

/// An environment-backed binding whose variable was unset or empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// Environment variable that was looked up
    pub requested_key: String,
    /// Output key it would have been stored under
    pub bound_to: String,
    /// Provider that declared the binding
    pub source_provider: String,
}

/// Merged secrets plus every missing environment binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionOutcome {
    secrets: SecretNamespace,
    missing: Vec<MissingField>,
}

impl CollectionOutcome {
    pub fn secrets(&self) -> &SecretNamespace {
        &self.secrets
    }

    pub fn missing(&self) -> &[MissingField] {
        &self.missing
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn into_secrets(self) -> SecretNamespace {
        self.secrets
    }
}

/// Runs every provider through its adapter and merges the results
#[derive(Debug, Default)]
pub struct Collector<E = ProcessEnv> {
    env: E,
}

impl Collector<ProcessEnv> {
    /// Create a collector reading the process environment
    pub fn new() -> Self {
        Self { env: ProcessEnv }
    }
}

impl<E: EnvSource> Collector<E> {
    /// Create a collector reading from a fixed environment
    pub fn with_env(env: E) -> Self {
        Self { env }
    }

    pub fn collect_config(&self, config: &SecretsConfig) -> Result<CollectionOutcome, SecretError> {
        self.collect(&config.providers)
    }

    /// Collect environment-backed providers, then file-backed ones, each group in order.
    ///
    /// Later providers win on output key collisions, so local files override the
    /// environment. Any file error aborts the whole collection.
    pub fn collect(&self, providers: &[ProviderSpec]) -> Result<CollectionOutcome, SecretError> {
        let mut outcome = CollectionOutcome::default();

        for spec in providers.iter().filter(|p| p.kind == ProviderKind::Environment) {
            tracing::debug!(provider = %spec.name, "Processing environment provider");
            let (secrets, missing) = backends::env::collect(spec, &self.env);
            tracing::debug!(
                provider = %spec.name,
                found = secrets.len(),
                missing = missing.len(),
                "Environment provider collected"
            );
            outcome.missing.extend(missing);
            merge(&mut outcome.secrets, secrets, &spec.name);
        }

        for spec in providers.iter().filter(|p| p.kind == ProviderKind::File) {
            tracing::debug!(provider = %spec.name, "Processing file provider");
            let secrets = backends::file::collect(spec).inspect_err(|e| {
                tracing::debug!(provider = %spec.name, error = %e, "File provider failed");
            })?;
            merge(&mut outcome.secrets, secrets, &spec.name);
        }

        tracing::debug!(
            secrets = outcome.secrets.len(),
            missing = outcome.missing.len(),
            "Collection finished"
        );
        Ok(outcome)
    }
}

fn merge(into: &mut SecretNamespace, from: SecretNamespace, provider: &str) {
    for (key, value) in from {
        tracing::debug!(provider, key = %key, value = %mask_secret(&value), "Adding secret");
        if let Some(previous) = into.insert(key, value) {
            tracing::debug!(
                provider,
                previous = %mask_secret(&previous),
                "Overrode value from an earlier provider"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldMap;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn env_provider(name: &str, source: &str, output: &str) -> ProviderSpec {
        ProviderSpec::new(
            name,
            ProviderKind::Environment,
            vec![FieldMap::new("m", "").bind(source, output)],
        )
    }

    #[test]
    fn test_later_environment_provider_wins() {
        let providers = vec![
            env_provider("first", "ONE", "X"),
            env_provider("second", "TWO", "X"),
        ];
        let collector = Collector::with_env(env(&[("ONE", "1"), ("TWO", "2")]));

        let outcome = collector.collect(&providers).unwrap();
        assert_eq!(outcome.secrets()["X"], "2");
        assert!(!outcome.has_missing());
    }

    #[test]
    fn test_file_providers_override_environment_regardless_of_declaration() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "A=5").unwrap();

        let providers = vec![
            ProviderSpec::new(
                "local",
                ProviderKind::File,
                vec![FieldMap::new("m", file.path()).bind("A", "X")],
            ),
            env_provider("cloud", "A", "X"),
        ];
        let collector = Collector::with_env(env(&[("A", "1")]));

        let outcome = collector.collect(&providers).unwrap();
        assert_eq!(outcome.secrets()["X"], "5");
    }

    #[test]
    fn test_later_file_provider_wins() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "A=first").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "B=second").unwrap();

        let providers = vec![
            ProviderSpec::new(
                "one",
                ProviderKind::File,
                vec![FieldMap::new("m", first.path()).bind("A", "X")],
            ),
            ProviderSpec::new(
                "two",
                ProviderKind::File,
                vec![FieldMap::new("m", second.path()).bind("B", "X")],
            ),
        ];

        let outcome = Collector::with_env(env(&[])).collect(&providers).unwrap();
        assert_eq!(outcome.secrets()["X"], "second");

        let reversed: Vec<_> = providers.into_iter().rev().collect();
        let outcome = Collector::with_env(env(&[])).collect(&reversed).unwrap();
        assert_eq!(outcome.secrets()["X"], "first");
    }

    #[test]
    fn test_later_field_map_wins_within_file_provider() {
        let mut shared = tempfile::NamedTempFile::new().unwrap();
        writeln!(shared, "A=from-a\nB=from-b").unwrap();

        let providers = vec![ProviderSpec::new(
            "local",
            ProviderKind::File,
            vec![
                FieldMap::new("first", shared.path()).bind("A", "X"),
                FieldMap::new("second", shared.path()).bind("B", "X"),
            ],
        )];

        let outcome = Collector::with_env(env(&[])).collect(&providers).unwrap();
        assert_eq!(outcome.secrets()["X"], "from-b");
    }

    #[test]
    fn test_missing_fields_accumulate_in_order() {
        let providers = vec![
            env_provider("p1", "GONE_1", "OUT_1"),
            env_provider("p2", "GONE_2", "OUT_2"),
        ];
        let outcome = Collector::with_env(env(&[])).collect(&providers).unwrap();

        assert!(outcome.has_missing());
        let cited: Vec<_> = outcome
            .missing()
            .iter()
            .map(|m| (m.source_provider.as_str(), m.requested_key.as_str()))
            .collect();
        assert_eq!(cited, vec![("p1", "GONE_1"), ("p2", "GONE_2")]);
        assert!(outcome.secrets().is_empty());
    }

    #[test]
    fn test_file_error_aborts_collection() {
        let providers = vec![
            env_provider("cloud", "A", "X"),
            ProviderSpec::new(
                "local",
                ProviderKind::File,
                vec![FieldMap::new("m", "/nonexistent/.env")],
            ),
        ];
        let result = Collector::with_env(env(&[("A", "1")])).collect(&providers);
        assert!(matches!(result, Err(SecretError::FileError { .. })));
    }

    #[test]
    fn test_no_providers() {
        let outcome = Collector::with_env(env(&[])).collect(&[]).unwrap();
        assert!(outcome.secrets().is_empty());
        assert!(!outcome.has_missing());
    }
}
