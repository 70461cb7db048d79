//! process-transcript - run one file through the Reconciler
//!
//! ```text
//! process-transcript HB meetings/2025-03-04.txt
//! process-transcript HB notes.docx --source-type document --source-name "Site walk"
//! process-transcript --provision HB
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use riskreg_common::config::{load_config, resolve_root_folder};
use riskreg_common::ProjectRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riskreg_ingest::api::process::VALID_SOURCE_TYPES;
use riskreg_ingest::documents::read_document;
use riskreg_ingest::extraction::AnthropicExtractor;
use riskreg_ingest::{ProcessResult, Reconciler};

/// Command-line arguments for process-transcript
#[derive(Parser, Debug)]
#[command(name = "process-transcript")]
#[command(about = "Extract risks and tasks from a transcript into a project's Risk Register")]
#[command(version)]
struct Args {
    /// Project code (e.g. HB)
    #[arg(required_unless_present = "provision")]
    project_code: Option<String>,

    /// Transcript file (.txt, .md, .docx)
    #[arg(required_unless_present = "provision")]
    transcript_path: Option<PathBuf>,

    /// Source type recorded in the Update Log
    #[arg(long, default_value = "meeting")]
    source_type: String,

    /// Source name recorded in the register (defaults to the file name)
    #[arg(long)]
    source_name: Option<String>,

    /// Folder containing Risk_Registers/
    #[arg(long, env = "RISKREG_ROOT")]
    root: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Create an empty Risk Register for a project code and exit
    #[arg(long, value_name = "CODE", conflicts_with_all = ["project_code", "transcript_path"])]
    provision: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riskreg_ingest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether processing succeeded
async fn run(args: Args) -> Result<bool> {
    let config = load_config(args.config.as_deref())?;
    let registry = ProjectRegistry::new(resolve_root_folder(args.root.as_deref(), &config));

    if let Some(code) = &args.provision {
        let path = registry.provision(code).await?;
        println!("Created Risk Register: {}", path.display());
        return Ok(true);
    }

    let (Some(project_code), Some(transcript_path)) = (args.project_code, args.transcript_path)
    else {
        bail!("PROJECT_CODE and TRANSCRIPT_PATH are required");
    };

    if !VALID_SOURCE_TYPES.contains(&args.source_type.as_str()) {
        bail!(
            "Invalid source type '{}'. Must be one of: {}",
            args.source_type,
            VALID_SOURCE_TYPES.join(", ")
        );
    }

    let content = read_document(&transcript_path)
        .await
        .with_context(|| format!("Failed to read {}", transcript_path.display()))?;
    if content.trim().is_empty() {
        bail!("Transcript {} is empty", transcript_path.display());
    }

    let source_name = args.source_name.unwrap_or_else(|| {
        transcript_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| transcript_path.display().to_string())
    });

    let api_key = riskreg_ingest::config::resolve_api_key(&config)?;
    let extractor = AnthropicExtractor::new(&config.model, api_key)?;
    let reconciler = Reconciler::new(registry, Arc::new(extractor));

    println!("Processing {} for project {}...", source_name, project_code);
    let result = reconciler
        .process(&project_code, &content, &args.source_type, &source_name)
        .await;

    print_result(&result);
    Ok(result.success)
}

fn print_result(result: &ProcessResult) {
    if !result.success {
        println!(
            "Processing failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    println!("Processing completed successfully!");
    if let Some(summary) = &result.summary {
        println!(
            "Summary: {} risks added, {} tasks added, {} decisions found",
            summary.risks_added, summary.tasks_added, summary.decisions_found
        );
    }

    if !result.changes.is_empty() {
        println!("Changes made:");
        for change in &result.changes {
            println!("  - {}", change);
        }
    }

    let decisions = result
        .extracted_data
        .as_ref()
        .map(|d| d.decisions.as_slice())
        .unwrap_or_default();
    if !decisions.is_empty() {
        println!("Decisions:");
        for decision in decisions {
            if decision.context.is_empty() {
                println!("  - {}", decision.decision);
            } else {
                println!("  - {} ({})", decision.decision, decision.context);
            }
        }
    }
}
