//! `keyfold github-secret add`

use std::io;

use anyhow::{Context, Result};
use clap::Args;
use crossterm::execute;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use keyfold_secrets::backends::teller::{remap_to_source_keys, ExportSource, TellerCli};
use keyfold_secrets::sync::github::GhCli;
use keyfold_secrets::sync::{
    ConfirmationState, OperationStats, OverwritePolicy, Prompter, RemoteSecretState, SyncEngine,
    SyncOptions,
};
use keyfold_secrets::{ProviderKind, SecretError, SecretNamespace, SecretsConfig};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Target repository (owner/repo)
    #[arg(long)]
    pub repo: String,

    /// Also set the secrets for Dependabot
    #[arg(long)]
    pub dependabot: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite existing secrets without asking
    #[arg(long)]
    pub force: bool,

    /// Leave existing secrets untouched
    #[arg(long)]
    pub skip_existing: bool,

    /// Ask before overwriting each existing secret
    #[arg(long)]
    pub confirm_overwrite: bool,
}

/// Reads answers from the terminal. The editor is only created once a question is asked.
#[derive(Default)]
pub struct TerminalPrompter {
    editor: Option<Editor<(), DefaultHistory>>,
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, SecretError> {
        let editor = match self.editor.take() {
            Some(editor) => editor,
            None => {
                let config = Config::builder().auto_add_history(false).build();
                Editor::with_config(config).map_err(|e| SecretError::Prompt(e.to_string()))?
            }
        };
        let editor = self.editor.insert(editor);

        match editor.readline(prompt) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(SecretError::Prompt(e.to_string())),
        }
    }
}

/// Sync the cloud-backed secrets into the repository
pub fn add(global: &GlobalArgs, args: &AddArgs) -> Result<()> {
    let policy =
        OverwritePolicy::from_flags(args.force, args.skip_existing, args.confirm_overwrite)?;

    let gh = GhCli::locate(args.repo.as_str())?;
    if !args.dry_run {
        gh.check_auth()?;
    }
    let teller = TellerCli::locate()?
        .with_config(global.config.clone())
        .with_verbose(global.verbose);

    let secrets = cloud_secrets(global, &teller)?;
    tracing::info!(count = secrets.len(), repo = gh.repo(), "Secrets to sync");

    let existing = RemoteSecretState::fetch(&gh, args.dependabot)
        .context("failed to get existing GitHub secrets")?;

    let options = SyncOptions {
        policy,
        include_dependabot: args.dependabot,
        dry_run: args.dry_run,
    };
    let mut prompter = TerminalPrompter::default();
    let mut confirmation = ConfirmationState::default();
    let stats = SyncEngine::new(&gh, &mut prompter, options)
        .run(&secrets, &existing, &mut confirmation)
        .context("failed to set GitHub secrets")?;

    print_summary(&stats, args.dry_run)
}

fn cloud_secrets(global: &GlobalArgs, teller: &TellerCli) -> Result<SecretNamespace> {
    let config =
        SecretsConfig::load(global.config.as_deref()).context("failed to load configuration")?;

    if config.providers_by_kind(ProviderKind::Environment).next().is_none() {
        tracing::info!("No environment providers configured, nothing to sync");
        return Ok(SecretNamespace::new());
    }

    let exported = teller
        .export()
        .context("failed to get secrets from teller")?;
    Ok(remap_to_source_keys(&config, exported))
}

/// Non-zero counters, labelled
pub fn summary_lines(stats: &OperationStats) -> Vec<(&'static str, usize)> {
    [
        ("Created", stats.created),
        ("Updated", stats.updated),
        ("Skipped", stats.skipped),
        ("Failed", stats.failed),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .collect()
}

/// `Created: 2 secrets`, with the counts aligned
fn summary_text(label: &str, count: usize) -> String {
    format!("{:<8} {} secrets", format!("{}:", label), count)
}

fn summary_header(dry_run: bool) -> &'static str {
    if dry_run {
        "Dry-run summary:"
    } else {
        "Operation summary:"
    }
}

fn print_summary(stats: &OperationStats, dry_run: bool) -> Result<()> {
    let mut stdout = io::stdout();

    println!();
    execute!(
        stdout,
        SetAttribute(Attribute::Bold),
        Print(summary_header(dry_run)),
        SetAttribute(Attribute::Reset),
    )?;
    println!();

    let lines = summary_lines(stats);
    if lines.is_empty() {
        execute!(
            stdout,
            SetForegroundColor(Color::DarkGrey),
            Print("  No secrets processed"),
            ResetColor,
        )?;
        println!();
        return Ok(());
    }

    for (label, count) in lines {
        let color = match label {
            "Created" => Color::Green,
            "Updated" => Color::Cyan,
            "Failed" => Color::Red,
            _ => Color::DarkGrey,
        };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!("  {}", summary_text(label, count))),
            ResetColor,
        )?;
        println!();
    }
    Ok(())
}
