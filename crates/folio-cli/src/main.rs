//! Folio CLI: create and list projects.
//!
//! Storage and persistence are configured through the environment or a `.env` file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_cli::{read_asset, to_json};
use folio_core::models::CreateProjectRequest;
use folio_core::Config;
use folio_infra::{init_telemetry, log_error, ErrorResponse, LogFormat};
use folio_services::{build_project_service, CreateProjectError, ProjectService};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "folio", about = "Project portfolio uploads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project from a thumbnail and gallery images
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        service_type: String,
        #[arg(long)]
        description: Option<String>,
        /// Path to the thumbnail image
        #[arg(long)]
        thumbnail: PathBuf,
        /// Gallery image path; repeat for more, order is kept
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// List projects, newest first
    List {
        /// Case-insensitive substring filter
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "0")]
        page: i64,
        #[arg(long, default_value = "10")]
        size: i64,
    },
    /// Show a project by its unique id
    Get { unique_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry(LogFormat::from_env())?;

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let (service, pool) = build_project_service(&config).await?;

    let result = run(&service, cli.command).await;
    pool.shutdown().await;

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(report) => {
            eprintln!("{}", report);
            std::process::exit(1);
        }
    }
}

/// Run a command. `Err` holds the JSON error report.
async fn run(service: &ProjectService, command: Commands) -> Result<String, String> {
    match command {
        Commands::Create {
            title,
            service_type,
            description,
            thumbnail,
            images,
        } => {
            let thumbnail = read_asset(&thumbnail).await.map_err(|e| e.to_string())?;
            let mut gallery = Vec::with_capacity(images.len());
            for path in &images {
                gallery.push(read_asset(path).await.map_err(|e| e.to_string())?);
            }

            let request = CreateProjectRequest {
                title,
                description,
                service_type,
                thumbnail,
                images: gallery,
            };

            match service.create_project_with_assets(request).await {
                Ok(project) => to_json(&project).map_err(|e| e.to_string()),
                Err(err) => Err(create_error_report(&err)),
            }
        }
        Commands::List { search, page, size } => {
            match service.find_all_projects(search.as_deref(), page, size).await {
                Ok(page) => to_json(&page).map_err(|e| e.to_string()),
                Err(err) => {
                    log_error(&err);
                    Err(report_json(ErrorResponse::from_error(&err)))
                }
            }
        }
        Commands::Get { unique_id } => match service.find_by_unique_id(unique_id).await {
            Ok(project) => to_json(&project).map_err(|e| e.to_string()),
            Err(err) => {
                log_error(&err);
                Err(report_json(ErrorResponse::from_error(&err)))
            }
        },
    }
}

fn create_error_report(err: &CreateProjectError) -> String {
    log_error(err);
    let mut response = ErrorResponse::from_error(err);
    if let CreateProjectError::Validation(fields) = err {
        response = response.with_extra(serde_json::json!({ "fields": fields }));
    } else if let Some(cleanup) = err.cleanup() {
        response = response.with_extra(serde_json::json!({
            "cleanup": {
                "attempted": cleanup.attempted,
                "deleted": cleanup.deleted,
                "notFound": cleanup.not_found,
                "failed": cleanup.failed,
            }
        }));
    }
    report_json(response)
}

fn report_json(response: ErrorResponse) -> String {
    to_json(&response).unwrap_or_else(|_| response.error)
}
