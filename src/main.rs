//! fddflow - guided design workflows proposed from your codebase.
//!
//! Resolves a workflow, proposes answers from static analysis, asks the
//! human to confirm them and writes design artifacts with provenance.

#![allow(clippy::single_match_else)]

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fddflow::artifact::validate_artifact;
use fddflow::pipeline::{exit, exit_code_for, Pipeline};
use fddflow::session::{AutoInteractor, Interactor, TerminalInteractor};
use fddflow::workflow::WorkflowSource;
use fddflow::Config;

/// Guided design workflows whose answers are proposed from your codebase
#[derive(Parser)]
#[command(name = "fddflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to .fddflow.toml, then the user config)
    #[arg(long, global = true, env = "FDDFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List workflows in the catalog
    List {
        /// Codebase whose workflow directories are searched
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Print the resolved step sequence of a workflow
    Resolve {
        /// Workflow name
        workflow: String,

        /// Codebase whose workflow directories are searched
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Run detectors and print their signals
    Detect {
        /// Codebase to analyse
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Detector to run (repeatable, defaults to every enabled detector)
        #[arg(short, long = "detector")]
        detectors: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show proposals for each question of a workflow
    Propose {
        /// Workflow name
        workflow: String,

        /// Codebase to analyse
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Answer a workflow and generate its artifacts
    Run {
        /// Workflow name
        workflow: String,

        /// Codebase to analyse
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Artifact output directory (defaults to artifacts.output_dir under PATH)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Session state file, resumed when present
        #[arg(long)]
        state: Option<PathBuf>,

        /// Confirm top proposals and defaults without prompting
        #[arg(long)]
        non_interactive: bool,

        /// Preset answer (step=value), repeatable; used with --non-interactive
        #[arg(short, long = "answer")]
        answers: Vec<String>,
    },

    /// Check an artifact for placeholders and section structure
    Validate {
        /// Artifact to check
        file: PathBuf,

        /// Required section id (repeatable), e.g. A
        #[arg(short, long = "section")]
        sections: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show effective configuration
    Config {
        /// Show config directory path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for(&e);
            if code == exit::INTERRUPTED {
                eprintln!("Interrupted; answers so far were kept.");
            } else {
                eprintln!("Error: {e:#}");
            }
            code
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List { path } => cmd_list(&path, config),
        Commands::Resolve { workflow, path, format } => cmd_resolve(&workflow, &path, config, format),
        Commands::Detect { path, detectors, format } => cmd_detect(&path, config, detectors, format),
        Commands::Propose { workflow, path, format } => cmd_propose(&workflow, &path, config, format),
        Commands::Run { workflow, path, out, state, non_interactive, answers } => {
            cmd_run(&workflow, &path, config, out, state, non_interactive, &answers)
        }
        Commands::Validate { file, sections, format } => cmd_validate(&file, &sections, format),
        Commands::Config { path } => cmd_config(path, &config),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(exit::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

/// List workflows.
fn cmd_list(path: &Path, config: Config) -> Result<i32> {
    let pipeline = Pipeline::new(path, config)?;
    let catalog = pipeline.catalog();

    for definition in catalog.definitions() {
        let source = match catalog.source(&definition.name) {
            Some(WorkflowSource::Builtin) | None => "builtin".to_string(),
            Some(WorkflowSource::Directory(dir)) => dir.display().to_string(),
            Some(WorkflowSource::Inline) => "inline".to_string(),
        };
        let parent = definition.parent.as_deref().map(|p| format!(" (extends {p})")).unwrap_or_default();
        println!(
            "{}{} - {} [{}]",
            definition.name,
            parent,
            definition.description.as_deref().unwrap_or(""),
            source
        );
    }
    println!("\nTotal: {} workflows", catalog.len());

    Ok(exit::SUCCESS)
}

/// Print a resolved workflow.
fn cmd_resolve(name: &str, path: &Path, config: Config, format: Format) -> Result<i32> {
    let default_threshold = config.general.threshold;
    let pipeline = Pipeline::new(path, config)?;
    let workflow = pipeline.resolve(name)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&workflow)?),
        Format::Text => {
            println!("Workflow: {}", workflow.name);
            println!("Chain: {}", workflow.chain.join(" -> "));
            println!("Threshold: {:.2}%\n", workflow.threshold_or(default_threshold));
            for (index, step) in workflow.steps.iter().enumerate() {
                match &step.artifact {
                    Some(artifact) => {
                        let per_feature = if artifact.per_feature { " (per feature)" } else { "" };
                        println!("  {index:>2}. {} -> {}{per_feature}", step.id, artifact.output);
                    }
                    None => {
                        let hook = step
                            .proposal
                            .as_ref()
                            .map(|h| format!(" [{}: {}]", h.kind, h.detectors.join(", ")))
                            .unwrap_or_default();
                        println!("  {index:>2}. {}{hook} - {}", step.id, step.prompt);
                    }
                }
            }
        }
    }

    Ok(exit::SUCCESS)
}

/// Run detectors.
fn cmd_detect(path: &Path, config: Config, detectors: Vec<String>, format: Format) -> Result<i32> {
    let detectors = if detectors.is_empty() { config.detection.enabled.clone() } else { detectors };
    let pipeline = Pipeline::new(path, config)?;
    let report = pipeline.detect(&detectors)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            for signal in &report.signals {
                println!(
                    "{:<12} {:<14} {:<32} {:.2}",
                    signal.detector,
                    signal.kind,
                    signal.value().unwrap_or(""),
                    signal.confidence
                );
            }
            println!("\nTotal: {} signals", report.signals.len());
            if !report.degradations.is_empty() {
                println!("{}", report.degradations.summary());
                for message in report.degradations.messages() {
                    println!("  - {message}");
                }
            }
        }
    }

    Ok(exit::SUCCESS)
}

/// Show proposals per question.
fn cmd_propose(name: &str, path: &Path, config: Config, format: Format) -> Result<i32> {
    let pipeline = Pipeline::new(path, config)?;
    let prepared = pipeline.prepare(name)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&prepared.proposals)?),
        Format::Text => {
            for step in prepared.workflow.questions() {
                let proposals = prepared.proposals.for_step(&step.id);
                if proposals.is_empty() {
                    println!("{}: (no proposal)", step.id);
                    continue;
                }
                println!("{}:", step.id);
                for proposal in proposals {
                    println!(
                        "  {} ({:.0}%) from {}",
                        proposal.value,
                        proposal.confidence * 100.0,
                        proposal.summary()
                    );
                }
            }
            if !prepared.report.degradations.is_empty() {
                println!("\n{}", prepared.report.degradations.summary());
            }
        }
    }

    Ok(exit::SUCCESS)
}

/// Answer a workflow and write its artifacts.
fn cmd_run(
    name: &str,
    path: &Path,
    config: Config,
    out: Option<PathBuf>,
    state: Option<PathBuf>,
    non_interactive: bool,
    answers: &[String],
) -> Result<i32> {
    let out_dir = out.unwrap_or_else(|| path.join(&config.artifacts.output_dir));
    let state_path =
        state.unwrap_or_else(|| path.join(".fddflow").join("state").join(format!("{name}.json")));

    let pipeline = Pipeline::new(path, config)?;
    let prepared = pipeline.prepare(name)?;

    let reported = state_path.clone();
    let publishing = pipeline.publishing();
    let deferred = Arc::new(AtomicBool::new(false));
    let deferred_in_handler = Arc::clone(&deferred);
    ctrlc::set_handler(move || {
        if publishing.load(Ordering::SeqCst) {
            eprintln!("\nInterrupted. Finishing artifact publish first...");
            deferred_in_handler.store(true, Ordering::SeqCst);
            return;
        }
        eprintln!("\nInterrupted. Progress saved to {}", reported.display());
        std::process::exit(exit::INTERRUPTED);
    })?;

    let mut interactor: Box<dyn Interactor> = if non_interactive {
        Box::new(AutoInteractor::new().with_answers(parse_answers(answers)?))
    } else {
        Box::new(TerminalInteractor::stdio())
    };

    let report = pipeline.run(&prepared, interactor.as_mut(), Some(&state_path), &out_dir)?;

    println!();
    for (artifact, path) in report.artifacts.iter().zip(&report.paths) {
        println!(
            "{:<13} {} ({:.2}%)",
            artifact.status.to_string(),
            path.display(),
            artifact.provenance.score
        );
    }
    if report.artifacts.is_empty() {
        println!("No artifacts generated.");
    }

    if deferred.load(Ordering::SeqCst) {
        return Ok(exit::INTERRUPTED);
    }
    Ok(report.exit_code())
}

fn parse_answers(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (step, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Invalid answer '{pair}', expected step=value"))?;
            let (step, value) = (step.trim(), value.trim());
            if step.is_empty() || value.is_empty() {
                anyhow::bail!("Invalid answer '{pair}', step and value cannot be empty");
            }
            Ok((step.to_string(), value.to_string()))
        })
        .collect()
}

/// Check an artifact file.
fn cmd_validate(file: &Path, sections: &[String], format: Format) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    let report = validate_artifact(&text, sections);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!("{}: {}", file.display(), report.status);
            for finding in report.findings() {
                println!("  - {finding}");
            }
        }
    }

    Ok(if report.passed() { exit::SUCCESS } else { exit::ERROR })
}

/// Show config.
fn cmd_config(show_path: bool, config: &Config) -> Result<i32> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(exit::SUCCESS);
    }

    let toml = toml::to_string_pretty(config)?;
    println!("{toml}");

    Ok(exit::SUCCESS)
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "fddflow", &mut io::stdout());
}
