//! Flowable AI Modeler CLI
//!
//! Main entry point for the flowable-modeler command-line tool.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowable_ai_modeler::app::{Modeler, DEFAULT_EXPORT_FILE};
use flowable_ai_modeler::bpmn::parse_steps_from_prompt;
use flowable_ai_modeler::storage::get_data_dir;
use flowable_ai_modeler::storage::settings::SettingsOverrides;
use flowable_ai_modeler::types::Status;

#[derive(Parser)]
#[command(name = "flowable-modeler")]
#[command(about = "Turn process descriptions into Flowable BPMN diagrams", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory holding the saved settings and the current diagram
    #[arg(long, global = true, env = "FLOWABLE_MODELER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EndpointArgs {
    /// Chat-completion endpoint URL
    #[arg(long, env = "FLOWABLE_AI_ENDPOINT")]
    endpoint: Option<String>,
    /// Model name sent to the endpoint
    #[arg(long, env = "FLOWABLE_AI_MODEL")]
    model: Option<String>,
    /// API key sent as a bearer token
    #[arg(long, env = "FLOWABLE_AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl From<EndpointArgs> for SettingsOverrides {
    fn from(args: EndpointArgs) -> Self {
        Self {
            endpoint: args.endpoint,
            model: args.model,
            api_key: args.api_key,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a diagram from a process description and load it
    Generate {
        /// Process description, or "-" to read it from stdin
        prompt: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Also export the generated diagram to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the current diagram with the starter process
    Reset,

    /// Write the current diagram to a .bpmn file
    Export {
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
        output: PathBuf,
    },

    /// Describe the current diagram
    Show {
        /// Print the BPMN XML instead of a summary
        #[arg(long)]
        xml: bool,
    },

    /// Print the steps that would be extracted from a description
    Steps {
        /// Process description, or "-" to read it from stdin
        prompt: String,
    },

    /// Settings for remote generation
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the saved settings
    Show,
    /// Update the saved settings
    Set {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

fn read_prompt(prompt: String) -> std::io::Result<String> {
    if prompt != "-" {
        return Ok(prompt);
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn print_status(status: &Status) -> ExitCode {
    if status.is_error() {
        eprintln!("✗ {}", status);
        ExitCode::FAILURE
    } else {
        println!("✓ {}", status);
        ExitCode::SUCCESS
    }
}

fn print_summary(modeler: &Modeler) {
    let Some(current) = modeler.current() else {
        println!("No diagram loaded");
        return;
    };
    println!("Origin:  {:?}", current.origin);
    println!("Updated: {}", current.updated_at.to_rfc3339());

    if let Some(document) = modeler.document() {
        for process in &document.processes {
            println!(
                "Process {} ({}){}",
                process.id,
                process.name.as_deref().unwrap_or("unnamed"),
                if process.is_executable { ", executable" } else { "" }
            );
            println!(
                "  {} elements, {} tasks, {} gateways, {} sequence flows",
                process.elements.len(),
                process.task_count(),
                process.gateway_count(),
                process.flows.len()
            );
            for element in &process.elements {
                println!(
                    "  - {:?} {}{}",
                    element.kind,
                    element.id,
                    element
                        .name
                        .as_deref()
                        .map(|name| format!(" \"{}\"", name))
                        .unwrap_or_default()
                );
            }
        }
    }

    for warning in modeler.warnings() {
        println!("warning: {}", warning);
    }
}

/// Open the session and load the current diagram
fn open_session(data_dir: PathBuf) -> Result<Modeler, ExitCode> {
    let mut modeler = Modeler::open(data_dir);
    let status = modeler.initialize();
    if status.is_error() {
        return Err(print_status(&status));
    }
    Ok(modeler)
}

fn export(modeler: &Modeler, path: &Path) -> ExitCode {
    let status = modeler.export(path);
    let code = print_status(&status);
    if !status.is_error() {
        println!("  {}", path.display());
    }
    code
}

async fn run(cli: Cli) -> ExitCode {
    let data_dir = match cli.data_dir.map(Ok).unwrap_or_else(get_data_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Steps { prompt } => {
            let prompt = match read_prompt(prompt) {
                Ok(prompt) => prompt,
                Err(e) => return print_status(&Status::error(format!("Cannot read prompt: {}", e))),
            };
            let steps = parse_steps_from_prompt(prompt.trim());
            if steps.is_empty() {
                println!("No steps found; the default tasks would be used.");
            }
            for (index, step) in steps.iter().enumerate() {
                println!("{}. {}", index + 1, step);
            }
            ExitCode::SUCCESS
        }
        Commands::Config(ConfigCommands::Show) => {
            let modeler = Modeler::open(data_dir);
            let settings = modeler.settings();
            println!("Data dir: {}", modeler.data_dir().display());
            println!("Endpoint: {}", settings.endpoint);
            println!("Model:    {}", settings.model);
            println!("API key:  {}", settings.masked_api_key());
            println!(
                "Remote generation: {}",
                if settings.is_configured() { "enabled" } else { "disabled" }
            );
            ExitCode::SUCCESS
        }
        Commands::Config(ConfigCommands::Set { endpoint }) => {
            let mut modeler = Modeler::open(data_dir);
            let status = match modeler.update_settings(&endpoint.into()) {
                Ok(()) => Status::info("Settings saved."),
                Err(e) => Status::error(format!("Saving settings failed: {}", e)),
            };
            print_status(&status)
        }
        Commands::Generate {
            prompt,
            endpoint,
            output,
        } => {
            // A successful generation replaces whatever diagram failed to load
            let mut modeler = Modeler::open(data_dir);
            let status = modeler.initialize();
            if status.is_error() {
                tracing::warn!("{}", status);
            }
            let prompt = match read_prompt(prompt) {
                Ok(prompt) => prompt,
                Err(e) => {
                    return print_status(&Status::error(format!(
                        "Generation failed: cannot read prompt: {}",
                        e
                    )))
                }
            };
            let status = modeler.generate(&prompt, &endpoint.into()).await;
            let code = print_status(&status);
            match output {
                Some(path) if !status.is_error() => export(&modeler, &path),
                _ => code,
            }
        }
        Commands::Reset => print_status(&Modeler::open(data_dir).reset()),
        Commands::Export { output } => match open_session(data_dir) {
            Ok(modeler) => export(&modeler, &output),
            Err(code) => code,
        },
        Commands::Show { xml } => {
            let modeler = match open_session(data_dir) {
                Ok(modeler) => modeler,
                Err(code) => return code,
            };
            match (xml, modeler.current()) {
                (true, Some(current)) => println!("{}", current.xml),
                _ => print_summary(&modeler),
            }
            ExitCode::SUCCESS
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}
