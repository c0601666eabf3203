use std::path::PathBuf;

use clap::Parser;
use ragdesk::{
    azure::ResponseFormat,
    backend::RagBackend,
    collection::{PipelineReport, StepOutcome},
    config::{EXAMPLE_CONFIG, RagConfig},
    observability::init_tracing,
    rag::{PromptKind, QueryRequest},
};

const DEFAULT_CONFIG_FILE: &str = "ragdesk.toml";

#[derive(Parser, Debug)]
#[command(version, about = "Per-user RAG collections on Azure", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file. Without it, settings are read from the
    /// AZURE_* environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Upload documents for a user and build the index pipeline if needed
    Index {
        #[arg(short, long)]
        user: String,
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question over a user's documents
    Query {
        #[arg(short, long)]
        user: String,
        /// Restrict retrieval to these uploaded files (repeatable)
        #[arg(short, long = "file")]
        files: Vec<String>,
        /// Response format: text or json (default: json for extraction
        /// prompts, text otherwise)
        #[arg(long)]
        format: Option<ResponseFormat>,
        /// Prompt template: base, document-metadata or policy-challenges
        #[arg(long, default_value = "base")]
        prompt: PromptKind,
        /// Print citations along with the answer (JSON)
        #[arg(long)]
        citations: bool,
        question: String,
    },
    /// Delete every cloud resource belonging to a user
    DeleteUser {
        #[arg(short, long)]
        user: String,
    },
    /// Write an example configuration file
    Init {
        /// Output path (default: ./ragdesk.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let command = match args.command {
        Command::Init { output, force } => {
            run_init(output, force);
            return;
        }
        command => command,
    };

    let config = load_config(args.config.as_deref());
    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("{}", e);
    }

    let backend = match RagBackend::from_config(config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match command {
        Command::Index { user, files } => run_index(&backend, &user, &files).await,
        Command::Query {
            user,
            files,
            format,
            prompt,
            citations,
            question,
        } => {
            let format = format.unwrap_or(if prompt.expects_json() {
                ResponseFormat::Json
            } else {
                ResponseFormat::Text
            });
            let request = QueryRequest::new(question)
                .with_prompt(prompt.template())
                .with_selected_files(files)
                .with_response_format(format);
            run_query(&backend, &user, &request, citations).await
        }
        Command::DeleteUser { user } => run_delete(&backend, &user).await,
        Command::Init { .. } => {}
    }
}

fn load_config(path: Option<&std::path::Path>) -> RagConfig {
    let result = match path {
        Some(path) => RagConfig::from_file(path),
        None => RagConfig::from_env(),
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_index(backend: &RagBackend, user: &str, files: &[PathBuf]) {
    let report = match backend.index_documents(user, files).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    for name in &report.uploaded {
        println!("uploaded  {}", name);
    }
    for name in &report.already_present {
        println!("present   {}", name);
    }
    for path in &report.skipped {
        println!("skipped   {}", path.display());
    }

    match &report.pipeline {
        Some(pipeline) => {
            print_pipeline(pipeline);
            if !pipeline.is_success() {
                std::process::exit(1);
            }
        }
        None => println!("No new documents; index pipeline unchanged."),
    }
}

async fn run_query(backend: &RagBackend, user: &str, request: &QueryRequest, citations: bool) {
    let result = if citations {
        backend
            .query_with_citations(user, request)
            .await
            .map(|answer| serde_json::to_string_pretty(&answer).unwrap_or_default())
    } else {
        backend.query(user, request).await
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_delete(backend: &RagBackend, user: &str) {
    let report = backend.delete_user(user).await;
    print_pipeline(&report);
    if !report.is_success() {
        std::process::exit(1);
    }
}

fn print_pipeline(report: &PipelineReport) {
    for step in &report.steps {
        let status = match &step.outcome {
            StepOutcome::Completed => "ok".to_string(),
            StepOutcome::Skipped { reason } => format!("skipped ({})", reason),
            StepOutcome::Failed { reason } => format!("FAILED ({})", reason),
        };
        println!("{:<12} {:<32} {}", step.resource.to_string(), step.name, status);
    }
    println!("Finished in {} ms", report.duration_ms);
}

/// Write the example configuration file.
fn run_init(output: Option<PathBuf>, force: bool) {
    let output_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, EXAMPLE_CONFIG) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set the referenced AZURE_* variables, then run:");
    println!(
        "  ragdesk --config {} index --user <user-id> <files>...",
        output_path.display()
    );
}
