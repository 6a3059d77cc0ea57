//! Environment-backed provider adapter

use std::collections::{BTreeMap, HashMap};

use crate::collector::MissingField;
use crate::config::ProviderSpec;
use crate::mask::mask_secret;
use crate::SecretNamespace;

/// Read access to environment variables
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Collect bound environment variables for one provider.
///
/// Every explicit binding whose variable is unset or empty yields a [`MissingField`].
/// Field maps without bindings are skipped: discovery is not supported for the environment.
pub fn collect(spec: &ProviderSpec, env: &impl EnvSource) -> (SecretNamespace, Vec<MissingField>) {
    let mut secrets = SecretNamespace::new();
    let mut missing = Vec::new();

    for (index, map) in spec.maps.iter().enumerate() {
        if map.is_discovery() {
            tracing::debug!(
                provider = %spec.name,
                map = %map.id,
                "Discovery mode not supported for environment provider, skipping map {}",
                index + 1
            );
            continue;
        }

        for (source_key, output_key) in map.bindings() {
            match env.var(source_key).filter(|v| !v.is_empty()) {
                Some(value) => {
                    tracing::debug!(
                        provider = %spec.name,
                        source = source_key,
                        key = output_key,
                        value = %mask_secret(&value),
                        "Found environment variable"
                    );
                    secrets.insert(output_key.to_string(), value);
                }
                None => {
                    tracing::debug!(
                        provider = %spec.name,
                        source = source_key,
                        "Environment variable not found or empty"
                    );
                    missing.push(MissingField {
                        requested_key: source_key.to_string(),
                        bound_to: output_key.to_string(),
                        source_provider: spec.name.clone(),
                    });
                }
            }
        }
    }

    (secrets, missing)
}
