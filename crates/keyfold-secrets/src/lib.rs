//! Secret collection, reconciliation and repository synchronization
//!
//! This crate gathers secrets from the providers declared in a `.teller.yml`-style
//! configuration and merges them into one namespace:
//!
//! - **Environment providers** (`environment` / `google_secretmanager`): bound variables are read
//!   from the process environment; unset or empty ones are reported as [`MissingField`]s
//! - **File providers** (`file` / `dotenv`): `KEY=VALUE` files, either through explicit
//!   bindings or passing every key through (discovery mode)
//!
//! File providers are merged after environment providers, so local overrides win.
//!
//! The [`sync`] module pushes a namespace into a remote store (GitHub repository
//! and Dependabot secrets via `gh`) under a chosen [`sync::OverwritePolicy`].
//!
//! # Example
//!
//! ```rust,ignore
//! use keyfold_secrets::{Collector, SecretsConfig};
//!
//! let config = SecretsConfig::load(None)?;
//! let outcome = Collector::new().collect_config(&config)?;
//! if outcome.has_missing() {
//!     // report outcome.missing()
//! }
//! ```
//!
//! # Features
//!
//! - `teller` (default): `teller export json` as an [`backends::teller::ExportSource`]
//! - `github` (default): `gh` as a [`sync::RemoteStore`]

use std::collections::BTreeMap;

pub mod backends;
mod collector;
pub mod config;
mod error;
mod mask;
#[cfg(any(feature = "teller", feature = "github"))]
pub mod process;
pub mod sync;

pub use backends::env::{EnvSource, ProcessEnv};
pub use collector::{CollectionOutcome, Collector, MissingField};
pub use config::{FieldMap, ProviderKind, ProviderSpec, SecretsConfig};
pub use error::SecretError;
pub use mask::mask_secret;

/// Output key to secret value. Sorted, so every rendering is stable.
pub type SecretNamespace = BTreeMap<String, String>;
