//! Actionable report for environment bindings that were not set

use keyfold_secrets::MissingField;

/// Which command hit the missing variables; shapes the wording and the workflow snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportContext {
    Run,
    Export,
    Shell,
}

impl ReportContext {
    fn lead(&self) -> &'static str {
        match self {
            Self::Run => "",
            Self::Export => "Cannot export: ",
            Self::Shell => "Cannot generate shell exports: ",
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            Self::Run => "Run with secrets",
            Self::Export => "Export with secrets",
            Self::Shell => "Set shell variables",
        }
    }

    fn run_line(&self) -> &'static str {
        match self {
            Self::Run => "keyfold run -- your-command",
            Self::Export => "keyfold export json",
            Self::Shell => "eval \"$(keyfold sh)\"",
        }
    }

    fn silent_hint(&self) -> &'static str {
        match self {
            Self::Run => {
                "Or use --silent flag to suppress this error and continue with available secrets only."
            }
            Self::Export | Self::Shell => "Or use --silent flag to export only available secrets.",
        }
    }
}

/// Missing environment variables, grouped by provider, with a workflow fix as help
#[derive(Debug, miette::Diagnostic, thiserror::Error)]
#[error("{summary}")]
#[diagnostic(code(keyfold::missing_variables))]
pub struct MissingVariablesDiagnostic {
    summary: String,
    #[help]
    help: String,
}

/// Build the report for `missing`
pub fn missing_variables(
    missing: &[MissingField],
    context: ReportContext,
) -> MissingVariablesDiagnostic {
    let mut summary = vec![format!(
        "{}Missing {} required environment variable(s) in GitHub Actions:",
        context.lead(),
        missing.len()
    )];

    // Group by provider, keeping first-appearance order
    let mut groups: Vec<(&str, Vec<&MissingField>)> = Vec::new();
    for field in missing {
        match groups
            .iter_mut()
            .find(|(provider, _)| *provider == field.source_provider)
        {
            Some((_, fields)) => fields.push(field),
            None => groups.push((field.source_provider.as_str(), vec![field])),
        }
    }

    for (provider, fields) in &groups {
        summary.push(String::new());
        summary.push(format!("Provider '{}':", provider));
        summary.extend(
            fields
                .iter()
                .map(|f| format!("  • {} (maps to: {})", f.requested_key, f.bound_to)),
        );
    }

    let mut help = vec![
        "To fix this, add the missing environment variables to your GitHub Actions workflow:"
            .to_string(),
        String::new(),
        "```yaml".to_string(),
        format!("- name: {}", context.step_name()),
        "  env:".to_string(),
    ];
    let mut seen: Vec<&str> = Vec::new();
    for field in missing {
        if seen.contains(&field.requested_key.as_str()) {
            continue;
        }
        seen.push(&field.requested_key);
        help.push(format!(
            "    {}: ${{{{ secrets.{} }}}}",
            field.requested_key, field.requested_key
        ));
    }
    help.push(format!("  run: {}", context.run_line()));
    help.push("```".to_string());
    help.push(String::new());
    help.push(context.silent_hint().to_string());

    MissingVariablesDiagnostic {
        summary: summary.join("\n"),
        help: help.join("\n"),
    }
}

/// Print a diagnostic to stderr
pub fn display_diagnostic(diagnostic: &dyn miette::Diagnostic) {
    let mut output = vec![String::new()];

    if let Some(code) = diagnostic.code() {
        output.push(format!("  × Error: {}", code));
        output.push(String::new());
    }

    output.extend(diagnostic.to_string().lines().map(|l| format!("  {}", l)));

    if let Some(help) = diagnostic.help() {
        output.push(String::new());
        output.push("  help:".to_string());
        output.extend(help.to_string().lines().map(|l| format!("  {}", l)));
    }

    eprintln!("{}\n", output.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;
    use pretty_assertions::assert_eq;

    fn field(source: &str, output: &str, provider: &str) -> MissingField {
        MissingField {
            requested_key: source.to_string(),
            bound_to: output.to_string(),
            source_provider: provider.to_string(),
        }
    }

    #[test]
    fn test_groups_by_provider_in_order() {
        let missing = vec![
            field("B_TOKEN", "B", "second"),
            field("A_TOKEN", "A", "first"),
            field("C_TOKEN", "C", "second"),
        ];
        let report = missing_variables(&missing, ReportContext::Run);

        assert_eq!(
            report.to_string(),
            "Missing 3 required environment variable(s) in GitHub Actions:\n\
             \n\
             Provider 'second':\n  \
             • B_TOKEN (maps to: B)\n  \
             • C_TOKEN (maps to: C)\n\
             \n\
             Provider 'first':\n  \
             • A_TOKEN (maps to: A)"
        );
    }

    #[test]
    fn test_help_contains_workflow_snippet() {
        let missing = vec![field("API_KEY", "KEY", "gsm"), field("API_KEY", "OTHER", "gsm2")];
        let report = missing_variables(&missing, ReportContext::Shell);
        let help = report.help().unwrap().to_string();

        assert!(report.to_string().starts_with("Cannot generate shell exports: Missing 2"));
        assert!(help.contains("- name: Set shell variables"));
        assert_eq!(help.matches("API_KEY: ${{ secrets.API_KEY }}").count(), 1);
        assert!(help.contains("  run: eval \"$(keyfold sh)\""));
        assert!(help.ends_with("Or use --silent flag to export only available secrets."));
    }

    #[test]
    fn test_export_wording() {
        let report = missing_variables(&[field("X", "Y", "p")], ReportContext::Export);
        assert!(report.to_string().starts_with("Cannot export: Missing 1"));
        assert!(report
            .help()
            .unwrap()
            .to_string()
            .contains("run: keyfold export json"));
    }
}
