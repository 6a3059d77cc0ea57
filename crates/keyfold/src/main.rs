use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keyfold_secrets::{Collector, SecretNamespace, SecretsConfig};

mod fallback;
mod github;
mod render;
mod report;
mod run;

use render::Format;
use report::{MissingVariablesDiagnostic, ReportContext};
use run::RunOptions;

/// keyfold - teller-compatible secret collection and GitHub secret sync
#[derive(Parser, Debug)]
#[command(name = "keyfold", version)]
#[command(about = "Collect secrets from teller-style configs, export them, and sync them to GitHub")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the teller config (default: search upward for .teller.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log everything, including subprocess details
    #[arg(long, global = true)]
    pub debug: bool,

    /// Continue with the available secrets when some are missing (not recommended)
    #[arg(long, global = true)]
    pub silent: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the secrets in the given format
    Export {
        #[arg(value_enum)]
        format: Format,
    },

    /// Print the secrets as KEY="value" lines (same as `export env`)
    Env,

    /// Print `export KEY='value'` lines for eval
    Sh,

    /// Run a command with the secrets in its environment
    Run {
        /// Start from an empty environment
        #[arg(short, long)]
        reset: bool,

        /// Run the command through $SHELL -c
        #[arg(short, long)]
        shell: bool,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Manage GitHub repository secrets
    #[command(subcommand)]
    GithubSecret(GithubSecretCommand),
}

#[derive(Subcommand, Debug)]
enum GithubSecretCommand {
    /// Sync the cloud-backed secrets into a repository
    Add(github::AddArgs),
}

impl Commands {
    /// The same invocation as teller arguments
    fn teller_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            Commands::Export { format } => {
                args.push("export".into());
                args.push(format.as_str().into());
            }
            Commands::Env => args.push("env".into()),
            Commands::Sh => args.push("sh".into()),
            Commands::Run {
                reset,
                shell,
                command,
            } => {
                args.push("run".into());
                if *reset {
                    args.push("--reset".into());
                }
                if *shell {
                    args.push("--shell".into());
                }
                args.push("--".into());
                args.extend(command.iter().map(OsString::from));
            }
            Commands::GithubSecret(_) => {}
        }
        args
    }
}

fn log_directive(global: &GlobalArgs, dry_run: bool) -> &'static str {
    if global.debug {
        "debug"
    } else if global.verbose || dry_run {
        "keyfold=info,keyfold_secrets=info"
    } else {
        "warn"
    }
}

fn init_logging(global: &GlobalArgs, dry_run: bool) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in log_directive(global, dry_run).split(',') {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

/// Collect from the configured providers, failing with a report when bindings are missing
fn collect(global: &GlobalArgs, context: ReportContext) -> Result<SecretNamespace> {
    let config =
        SecretsConfig::load(global.config.as_deref()).context("failed to load configuration")?;
    let outcome = Collector::new()
        .collect_config(&config)
        .context("failed to collect secrets")?;

    if outcome.has_missing() {
        if !global.silent {
            return Err(report::missing_variables(outcome.missing(), context).into());
        }
        tracing::debug!(
            missing = outcome.missing().len(),
            "Ignoring missing environment variables (--silent)"
        );
    }

    Ok(outcome.into_secrets())
}

fn dispatch(cli: Cli) -> Result<i32> {
    let global = &cli.global;

    if let Commands::GithubSecret(GithubSecretCommand::Add(args)) = &cli.command {
        github::add(global, args)?;
        return Ok(0);
    }

    if !fallback::in_github_actions() {
        tracing::debug!("Not running in GitHub Actions, delegating to teller");
        return fallback::delegate(global, cli.command.teller_args());
    }

    match &cli.command {
        Commands::Export { format } => {
            let secrets = collect(global, ReportContext::Export)?;
            print!("{}", render::render(*format, &secrets)?);
            Ok(0)
        }
        Commands::Env => {
            let secrets = collect(global, ReportContext::Export)?;
            print!("{}", render::render(Format::Env, &secrets)?);
            Ok(0)
        }
        Commands::Sh => {
            let secrets = collect(global, ReportContext::Shell)?;
            print!("{}", render::render_shell(&secrets));
            Ok(0)
        }
        Commands::Run {
            reset,
            shell,
            command,
        } => {
            let secrets = collect(global, ReportContext::Run)?;
            let options = RunOptions {
                reset: *reset,
                shell: *shell,
            };
            run::execute(command, &secrets, options)
        }
        Commands::GithubSecret(_) => Ok(0),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let dry_run = matches!(
        &cli.command,
        Commands::GithubSecret(GithubSecretCommand::Add(args)) if args.dry_run
    );
    if let Err(e) = init_logging(&cli.global, dry_run) {
        eprintln!("Error: failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match dispatch(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            if let Some(diagnostic) = e.downcast_ref::<MissingVariablesDiagnostic>() {
                report::display_diagnostic(diagnostic);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_hyphenated_arguments() {
        let cli = parse(&["keyfold", "run", "--reset", "--", "ls", "-la"]);
        match cli.command {
            Commands::Run {
                reset,
                shell,
                command,
            } => {
                assert!(reset);
                assert!(!shell);
                assert_eq!(command, vec!["ls", "-la"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["keyfold", "export", "csv", "--silent", "-c", "/tmp/t.yml"]);
        assert!(cli.global.silent);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/t.yml")));
    }

    #[test]
    fn test_teller_args_mirror_invocation() {
        let cli = parse(&["keyfold", "run", "--shell", "--", "echo", "$A"]);
        assert_eq!(
            cli.command.teller_args(),
            vec!["run", "--shell", "--", "echo", "$A"]
        );

        let cli = parse(&["keyfold", "export", "yaml"]);
        assert_eq!(cli.command.teller_args(), vec!["export", "yaml"]);
    }

    #[test]
    fn test_github_secret_add_flags() {
        let cli = parse(&[
            "keyfold",
            "github-secret",
            "add",
            "--repo",
            "acme/api",
            "--dependabot",
            "--dry-run",
            "--skip-existing",
        ]);
        match cli.command {
            Commands::GithubSecret(GithubSecretCommand::Add(args)) => {
                assert_eq!(args.repo, "acme/api");
                assert!(args.dependabot && args.dry_run && args.skip_existing);
                assert!(!args.force && !args.confirm_overwrite);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_directive() {
        let mut global = GlobalArgs::default();
        assert_eq!(log_directive(&global, false), "warn");
        assert_eq!(
            log_directive(&global, true),
            "keyfold=info,keyfold_secrets=info"
        );
        global.debug = true;
        assert_eq!(log_directive(&global, false), "debug");
    }
}
