//! Idempotent synchronization of collected secrets into a remote secret store
//!
//! The engine diffs the collected namespace against a snapshot of the remote
//! keys taken once per run, applies the overwrite policy per key and scope,
//! and counts what happened. The first failed mutation aborts the run.

mod confirm;
#[cfg(feature = "github")]
pub mod github;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::SecretError;
use crate::SecretNamespace;

pub use confirm::{ConfirmationState, Prompter, Response};

/// A remote secret namespace targeted independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Primary repository secrets
    Repository,
    /// Secrets visible to the Dependabot app
    Dependabot,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Repository => f.write_str("repository"),
            Scope::Dependabot => f.write_str("Dependabot"),
        }
    }
}

/// Remote-mutation collaborator
pub trait RemoteStore {
    /// Names of the secrets already present in `scope`
    fn list(&self, scope: Scope) -> Result<Vec<String>, SecretError>;

    /// Create or replace a secret
    fn set(&self, key: &str, value: &str, scope: Scope) -> Result<(), SecretError>;

    /// Human-readable, value-free description of what `set` would do
    fn describe_set(&self, key: &str, scope: Scope) -> String {
        format!("set {} secret {}", scope, key)
    }
}

/// How pre-existing remote secrets are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Overwrite without asking
    Force,
    /// Leave existing secrets untouched
    SkipExisting,
    /// Ask before overwriting each existing secret
    ConfirmEach,
    /// No strategy requested: overwrite
    #[default]
    DefaultOverwrite,
}

impl OverwritePolicy {
    /// Build the policy from mutually exclusive flags
    pub fn from_flags(force: bool, skip_existing: bool, confirm: bool) -> Result<Self, SecretError> {
        match (force, skip_existing, confirm) {
            (false, false, false) => Ok(Self::DefaultOverwrite),
            (true, false, false) => Ok(Self::Force),
            (false, true, false) => Ok(Self::SkipExisting),
            (false, false, true) => Ok(Self::ConfirmEach),
            _ => Err(SecretError::InvalidPolicy),
        }
    }
}

/// Snapshot of the remote keys, one presence set per scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSecretState {
    pub existing: BTreeSet<String>,
    pub existing_dependabot: BTreeSet<String>,
}

impl RemoteSecretState {
    pub fn new<I, J>(existing: I, existing_dependabot: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            existing: existing.into_iter().map(Into::into).collect(),
            existing_dependabot: existing_dependabot.into_iter().map(Into::into).collect(),
        }
    }

    /// List both scopes from the store. The Dependabot scope is only queried when requested.
    pub fn fetch<R: RemoteStore + ?Sized>(
        store: &R,
        include_dependabot: bool,
    ) -> Result<Self, SecretError> {
        let mut state = Self::default();

        state.existing = store.list(Scope::Repository)?.into_iter().collect();
        tracing::debug!(count = state.existing.len(), "Found existing repository secrets");

        if include_dependabot {
            state.existing_dependabot = store.list(Scope::Dependabot)?.into_iter().collect();
            tracing::debug!(
                count = state.existing_dependabot.len(),
                "Found existing Dependabot secrets"
            );
        }

        Ok(state)
    }

    pub fn contains(&self, scope: Scope, key: &str) -> bool {
        match scope {
            Scope::Repository => self.existing.contains(key),
            Scope::Dependabot => self.existing_dependabot.contains(key),
        }
    }
}

/// What happened to one key in one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Per-run counters. Only returned for runs that completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Mutations that failed. A failure aborts the run, so completed runs report zero.
    pub failed: usize,
}

impl OperationStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// Run-wide switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub policy: OverwritePolicy,
    /// Also sync into [`Scope::Dependabot`]
    pub include_dependabot: bool,
    /// Replace every mutation with a logged no-op
    pub dry_run: bool,
}

impl SyncOptions {
    fn scopes(&self) -> &'static [Scope] {
        if self.include_dependabot {
            &[Scope::Repository, Scope::Dependabot]
        } else {
            &[Scope::Repository]
        }
    }
}

/// Applies a namespace to a [`RemoteStore`]
pub struct SyncEngine<'a, R: ?Sized, P: ?Sized> {
    store: &'a R,
    prompter: &'a mut P,
    options: SyncOptions,
}

impl<'a, R, P> SyncEngine<'a, R, P>
where
    R: RemoteStore + ?Sized,
    P: Prompter + ?Sized,
{
    pub fn new(store: &'a R, prompter: &'a mut P, options: SyncOptions) -> Self {
        Self {
            store,
            prompter,
            options,
        }
    }

    /// Sync every key into every requested scope.
    ///
    /// `confirmation` carries yes-to-all / no-to-all decisions across keys and is
    /// only consulted under [`OverwritePolicy::ConfirmEach`].
    pub fn run(
        &mut self,
        secrets: &SecretNamespace,
        existing: &RemoteSecretState,
        confirmation: &mut ConfirmationState,
    ) -> Result<OperationStats, SecretError> {
        tracing::debug!(
            keys = secrets.len(),
            policy = ?self.options.policy,
            dry_run = self.options.dry_run,
            "Starting secret sync"
        );

        let mut stats = OperationStats::default();
        for (key, value) in secrets {
            for &scope in self.options.scopes() {
                let outcome = self.sync_one(key, value, scope, existing, confirmation)?;
                stats.record(outcome);
            }
        }
        Ok(stats)
    }

    fn sync_one(
        &mut self,
        key: &str,
        value: &str,
        scope: Scope,
        existing: &RemoteSecretState,
        confirmation: &mut ConfirmationState,
    ) -> Result<Outcome, SecretError> {
        if !existing.contains(scope, key) {
            tracing::info!(key, %scope, "Creating new secret");
            self.mutate(key, value, scope)?;
            return Ok(Outcome::Created);
        }

        match self.options.policy {
            OverwritePolicy::SkipExisting => {
                tracing::info!(key, %scope, "Skipped existing secret");
                return Ok(Outcome::Skipped);
            }
            OverwritePolicy::ConfirmEach => {
                let approved = if self.options.dry_run {
                    tracing::debug!(key, %scope, "Dry-run: assuming overwrite is confirmed");
                    true
                } else {
                    confirmation.decide(key, scope, &mut *self.prompter)
                };
                if !approved {
                    tracing::info!(key, %scope, "Skipped secret (user declined)");
                    return Ok(Outcome::Skipped);
                }
                tracing::info!(key, %scope, "Updating existing secret (user confirmed)");
            }
            OverwritePolicy::Force => {
                tracing::info!(key, %scope, "Updating existing secret (forced)");
            }
            OverwritePolicy::DefaultOverwrite => {
                tracing::info!(key, %scope, "Updating existing secret");
            }
        }

        self.mutate(key, value, scope)?;
        Ok(Outcome::Updated)
    }

    fn mutate(&self, key: &str, value: &str, scope: Scope) -> Result<(), SecretError> {
        if self.options.dry_run {
            tracing::info!("Would execute: {}", self.store.describe_set(key, scope));
            return Ok(());
        }
        self.store.set(key, value, scope)
    }
}
