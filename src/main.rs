//! Workflow Guardian CLI - Command-line interface for release pipeline validation
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like configuration discovery, process exit codes, and terminal output
//! - Provides clean separation between user interface and rule evaluation

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use workflow_guardian::{
    GuardConfig, GuardError, GuardResult, OutputFormat, ReportFormatter, ReportOptions,
    RuleCategory, WorkflowGuardian, DEFAULT_CONFIG_FILES,
};

/// Workflow Guardian - Static checks for the AppImage build and release workflow
#[derive(Parser)]
#[command(name = "workflow-guardian")]
#[command(version)]
#[command(about = "Validate the AppImage build and release workflow before it runs")]
#[command(long_about = "Workflow Guardian checks the GitHub Actions workflow, the AppImage-builder configuration and the project files it relies on. Every rule always runs; the exit code is 0 only when all of them pass.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every rule against the project (the default command)
    Check(CheckArgs),

    /// List registered rules
    Rules {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Explain what a specific rule checks
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Project root containing the workflow and builder files
    #[arg(long)]
    root: Option<PathBuf>,

    /// Workflow file, relative to the root
    #[arg(long)]
    workflow: Option<PathBuf>,

    /// AppImage-builder file, relative to the root
    #[arg(long)]
    builder: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Only list rules that did not pass
    #[arg(long)]
    failures_only: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Default for CheckArgs {
    fn default() -> Self {
        Self {
            root: None,
            workflow: None,
            builder: None,
            format: OutputFormatArg::Human,
            failures_only: false,
            output: None,
        }
    }
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli) -> GuardResult<i32> {
    let use_colors = !cli.no_color;

    match cli.command.unwrap_or_else(|| Commands::Check(CheckArgs::default())) {
        Commands::Check(args) => run_check(cli.config, args, use_colors),
        Commands::Rules { category } => run_list_rules(cli.config, category),
        Commands::Explain { rule_id } => run_explain(cli.config, &rule_id),
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
    }
}

/// Explicit configuration file, else the one discovered in `root`, else defaults
fn load_config(config_path: Option<PathBuf>, root: &Path) -> GuardResult<GuardConfig> {
    match config_path {
        Some(path) => GuardConfig::load_from_file(path),
        None => GuardConfig::discover(root),
    }
}

/// Configuration for a check run with command-line overrides applied
///
/// `--root` replaces the configured root; without it the configuration is
/// discovered in the current directory and its own root is kept.
fn check_config(config_path: Option<PathBuf>, args: &CheckArgs) -> GuardResult<GuardConfig> {
    let discovery_root = args.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = load_config(config_path, &discovery_root)?;
    if let Some(root) = &args.root {
        config = config.with_root(root.clone());
    }
    if let Some(workflow) = &args.workflow {
        config.paths.workflow = workflow.clone();
    }
    if let Some(builder) = &args.builder {
        config.paths.builder = builder.clone();
    }
    Ok(config)
}

fn run_check(config_path: Option<PathBuf>, args: CheckArgs, use_colors: bool) -> GuardResult<i32> {
    let config = check_config(config_path, &args)?;

    let guardian = WorkflowGuardian::new_with_config(config)?.with_report_formatter(
        ReportFormatter::new(ReportOptions {
            use_colors: use_colors && args.output.is_none(),
            failures_only: args.failures_only,
        }),
    );

    let report = guardian.validate();
    let format = args.format.into();
    match &args.output {
        Some(path) => {
            guardian.write_report(&report, format, File::create(path)?)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => guardian.write_report(&report, format, io::stdout().lock())?,
    }

    Ok(report.exit_code())
}

fn run_list_rules(config_path: Option<PathBuf>, category_filter: Option<String>) -> GuardResult<i32> {
    let category = match category_filter.as_deref() {
        Some(name) => match RuleCategory::from_name(name) {
            Some(category) => Some(category),
            None => {
                let names: Vec<_> = RuleCategory::all().iter().map(|c| c.as_str()).collect();
                eprintln!("❌ Unknown category '{name}'. Categories: {}", names.join(", "));
                return Ok(1);
            }
        },
        None => None,
    };

    let guardian = WorkflowGuardian::new_with_config(load_config(config_path, Path::new("."))?)?;

    println!("📋 Available Rules\n");

    for current in RuleCategory::all() {
        if category.is_some_and(|c| c != *current) {
            continue;
        }

        let rules: Vec<_> = guardian.rules().filter(|r| r.category() == *current).collect();
        if rules.is_empty() {
            continue;
        }

        println!("📂 {current}");
        for rule in rules {
            let status = if guardian.config().is_rule_enabled(rule.id()) { "✅" } else { "❌" };
            println!("  {status} {} - {}", rule.id(), rule.description());
        }
        println!();
    }

    let stats = guardian.rule_statistics();
    println!(
        "📊 {} rules in {} categories: {} enabled, {} disabled",
        stats.total_rules(),
        stats.categories,
        stats.enabled_rules,
        stats.disabled_rules
    );

    Ok(0)
}

fn run_explain(config_path: Option<PathBuf>, rule_id: &str) -> GuardResult<i32> {
    let guardian = WorkflowGuardian::new_with_config(load_config(config_path, Path::new("."))?)?;

    let Some(rule) = guardian.rule(rule_id) else {
        eprintln!("❌ Rule '{rule_id}' not found");
        println!();
        println!("Available rules:");
        for rule in guardian.rules() {
            println!("  - {}", rule.id());
        }
        return Ok(1);
    };

    println!("📖 Rule: {}", rule.id());
    println!("📂 Category: {}", rule.category());
    println!("✅ Enabled: {}", guardian.config().is_rule_enabled(rule.id()));
    println!();
    println!("📝 Description:");
    println!("   {}", rule.description());
    println!();
    println!("📄 Inputs:");
    match rule.category() {
        RuleCategory::Builder => println!("   {}", guardian.config().paths.builder.display()),
        RuleCategory::Project => {
            for file in &guardian.config().project.files {
                let suffix = if file.executable { " (executable)" } else { "" };
                println!("   {}{suffix}", file.path);
            }
        }
        _ => println!("   {}", guardian.config().paths.workflow.display()),
    }

    Ok(0)
}

fn run_validate_config(config_path: Option<PathBuf>) -> GuardResult<i32> {
    let config_path = match config_path {
        Some(path) => path,
        None => DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
            .ok_or_else(|| {
                GuardError::config(format!(
                    "No configuration file found (looked for {})",
                    DEFAULT_CONFIG_FILES.join(", ")
                ))
            })?,
    };

    println!("Validating configuration: {}", config_path.display());

    match GuardConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");
            println!("📊 Configuration summary:");
            println!("  Workflow: {}", config.paths.workflow.display());
            println!("  Builder: {}", config.paths.builder.display());
            println!("  Required jobs: {}", config.workflow.jobs.required.join(", "));
            println!("  Project files: {}", config.project.files.len());
            println!("  Disabled rules: {}", config.disabled_rules.len());
            println!("  Fingerprint: {}", config.fingerprint());
            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_command_on_empty_project() {
        let temp_dir = TempDir::new().unwrap();

        let args = CheckArgs {
            root: Some(temp_dir.path().to_path_buf()),
            format: OutputFormatArg::Json,
            ..Default::default()
        };

        // Nothing to validate, so rules fail (exit code 1)
        assert_eq!(run_check(None, args, false).unwrap(), 1);
    }

    #[test]
    fn test_check_command_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("bad.yaml");
        fs::write(&config_file, "version: \"9.9\"\n").unwrap();

        let args = CheckArgs {
            root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(run_check(Some(config_file), args, false).is_err());
    }

    #[test]
    fn test_configured_root_is_kept_without_root_flag() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("workflow_guardian.yaml");
        let project = temp_dir.path().join("project");
        fs::write(
            &config_file,
            format!("version: \"1.0\"\npaths:\n  root: {}\n  workflow: ci.yml\n  builder: AppImageBuilder.yml\n", project.display()),
        )
        .unwrap();

        let config = check_config(Some(config_file.clone()), &CheckArgs::default()).unwrap();
        assert_eq!(config.paths.root, project);
        assert_eq!(config.workflow_path(), project.join("ci.yml"));

        let args = CheckArgs {
            root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let config = check_config(Some(config_file), &args).unwrap();
        assert_eq!(config.paths.root, temp_dir.path());
    }

    #[test]
    fn test_check_writes_report_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.json");

        let args = CheckArgs {
            root: Some(temp_dir.path().to_path_buf()),
            format: OutputFormatArg::Json,
            output: Some(output.clone()),
            ..Default::default()
        };
        assert_eq!(run_check(None, args, true).unwrap(), 1);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["summary"]["total"], 23);
        assert_eq!(written["success"], false);
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("workflow_guardian.yaml");

        let yaml = serde_yaml::to_string(&GuardConfig::default()).unwrap();
        fs::write(&config_file, yaml).unwrap();
        assert_eq!(run_validate_config(Some(config_file.clone())).unwrap(), 0);

        fs::write(&config_file, "version: [").unwrap();
        assert_eq!(run_validate_config(Some(config_file)).unwrap(), 1);
    }

    #[test]
    fn test_explain_rule() {
        assert_eq!(run_explain(None, "push_filters").unwrap(), 0);
        assert_eq!(run_explain(None, "nonexistent_rule").unwrap(), 1);
    }

    #[test]
    fn test_list_rules() {
        assert_eq!(run_list_rules(None, None).unwrap(), 0);
        assert_eq!(run_list_rules(None, Some("permissions".to_string())).unwrap(), 0);
        assert_eq!(run_list_rules(None, Some("placeholders".to_string())).unwrap(), 1);
    }

    #[test]
    fn test_cli_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["workflow-guardian", "--no-color"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.no_color);

        let cli = Cli::try_parse_from([
            "workflow-guardian",
            "check",
            "--format",
            "github",
            "--failures-only",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Check(args)) => {
                assert!(args.failures_only);
                assert!(args.format == OutputFormatArg::Github);
            }
            _ => panic!("expected check command"),
        }
    }
}
