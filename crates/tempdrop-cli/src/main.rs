//! Tempdrop CLI: temporary file sharing through a hosted media store.
//!
//! Configure with TEMPDROP_CLOUD_NAME and TEMPDROP_API_KEY (environment or .env).
//! Files expire 24 hours after upload.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tempdrop_cli::{format_remaining, format_size, init_tracing, setup_guidance, truncate_string};
use tempdrop_core::{
    AppError, Clock, Config, ErrorMetadata, FileRecord, FilterSpec, LogLevel, SortField,
    SortOrder,
};
use tempdrop_services::{start_background_jobs, FileManager, Notification, ProgressCallback};

#[derive(Parser)]
#[command(name = "tempdrop", about = "Share files for 24 hours")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and index summary
    Status,
    /// Upload one or more files
    Upload {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List current files
    List {
        /// Case-insensitive search on the file name
        #[arg(long, default_value = "")]
        search: String,
        /// Sort field: name, time, size
        #[arg(long, default_value = "time")]
        sort: String,
        /// Sort order: asc, desc
        #[arg(long, default_value = "desc")]
        order: String,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download a file's content
    Download {
        /// File ID
        id: String,
        /// Output path (defaults to the original file name)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Delete {
        /// File ID
        id: String,
    },
    /// Delete several files
    DeleteBatch {
        /// File IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Share links
    Share {
        #[command(subcommand)]
        sub: ShareCommands,
    },
    /// Run the expiry monitor (and sync when enabled) until interrupted
    Watch,
}

#[derive(Subcommand)]
enum ShareCommands {
    /// Create a link carrying the given files (all current files when none given)
    Export {
        /// File IDs
        ids: Vec<String>,
        /// Base URL for the link
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Merge the files from a share link into the local index
    Import {
        /// Share link or bare token
        link: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport<'a> {
    provider: &'a str,
    cloud_name: Option<&'a str>,
    delete_mode: String,
    removal_policy: String,
    removes_remotely: bool,
    index_path: String,
    file_count: usize,
    total_bytes: u64,
    expiring_soon: usize,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Log the full error at its own level, then print the user-facing version.
fn print_app_error(context: &str, err: &AppError) {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error_code = code, error = %err, "{}", context),
        LogLevel::Warn => tracing::warn!(error_code = code, error = %err, "{}", context),
        LogLevel::Error => tracing::error!(error_code = code, error = %err, "{}", context),
    }

    eprintln!("{}: {}", context, err.user_message());
    if let Some(action) = err.suggested_action() {
        eprintln!("  hint: {}", action);
    }
}

fn print_table(manager: &FileManager, records: &[FileRecord]) {
    if records.is_empty() {
        println!("No files.");
        return;
    }

    let now = manager.clock().now();
    println!(
        "{:<36}  {:<32}  {:>10}  {:>9}  URL",
        "ID", "NAME", "SIZE", "EXPIRES"
    );
    for record in records {
        println!(
            "{:<36}  {:<32}  {:>10}  {:>9}  {}",
            record.id,
            truncate_string(&record.file_name, 32),
            format_size(record.file_size),
            format_remaining(record.remaining(now)),
            record.remote_url
        );
    }
}

async fn upload(manager: &FileManager, files: Vec<PathBuf>) -> anyhow::Result<bool> {
    let results = if let [single] = files.as_slice() {
        let label = single.display().to_string();
        let progress: ProgressCallback = Arc::new(move |fraction: f64| {
            eprint!("\r{}: {:>3.0}%", label, fraction * 100.0);
        });
        let result = manager.upload_file(single, Some(progress)).await;
        eprintln!();
        vec![(single.clone(), result)]
    } else {
        manager.upload_many(&files).await
    };

    let mut all_ok = true;
    for (path, result) in results {
        match result {
            Ok(record) => println!(
                "Uploaded {} ({}) id={} url={}",
                record.file_name,
                format_size(record.file_size),
                record.id,
                record.remote_url
            ),
            Err(e) => {
                all_ok = false;
                print_app_error(&path.display().to_string(), &e);
            }
        }
    }
    Ok(all_ok)
}

async fn watch(manager: &FileManager) -> anyhow::Result<()> {
    let (scheduler, mut notifications) = start_background_jobs(manager);
    eprintln!(
        "Watching {} (tasks: {}). Press Ctrl-C to stop.",
        manager.config().index_path.display(),
        scheduler.task_names().join(", ")
    );

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => {
                match &notification {
                    Notification::NearExpiry { file_name, expires_at, .. } => {
                        let remaining = *expires_at - manager.clock().now();
                        println!("{} expires in {}", file_name, format_remaining(remaining));
                    }
                    Notification::Expired { ids } => {
                        println!("{} file(s) expired and were removed", ids.len());
                    }
                    Notification::SyncMerged { count } => {
                        println!("{} file(s) merged from the shared index", count);
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    scheduler.stop().await;
    manager.index().flush_pending_deletes().await;
    Ok(())
}

async fn run(manager: FileManager, command: Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Status => {
            let records = manager.list(&FilterSpec::default()).await?;
            let expiring = manager
                .near_expiry(manager.config().near_expiry_window())
                .await?;
            let config = manager.config();
            print_json(&StatusReport {
                provider: manager.provider_name(),
                cloud_name: config.cloud_name(),
                delete_mode: config.delete_mode.to_string(),
                removal_policy: config.removal_policy.to_string(),
                removes_remotely: manager.removes_remotely(),
                index_path: config.index_path.display().to_string(),
                file_count: records.len(),
                total_bytes: records.iter().map(|r| r.file_size).sum(),
                expiring_soon: expiring.len(),
            })?;
        }
        Commands::Upload { files } => {
            let ok = upload(&manager, files).await?;
            manager.index().flush_pending_deletes().await;
            return Ok(ok);
        }
        Commands::List {
            search,
            sort,
            order,
            json,
        } => {
            let filter = FilterSpec {
                search_term: search,
                sort_by: sort.parse::<SortField>()?,
                sort_order: order.parse::<SortOrder>()?,
            };
            let records = manager.list(&filter).await?;
            if json {
                print_json(&records)?;
            } else {
                print_table(&manager, &records);
            }
        }
        Commands::Download { id, output } => {
            let (record, data) = manager.download(&id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&record.file_name));
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} ({})", path.display(), format_size(data.len() as u64));
        }
        Commands::Delete { id } => {
            let report = manager.delete_file(&id).await?;
            match (&report.remote, report.removed_locally) {
                (Ok(_), true) => println!("Deleted {}", report.id),
                (Err(e), true) if e.is_not_found() => {
                    println!("Deleted {} (already gone from the provider)", report.id)
                }
                (Err(e), true) => {
                    println!("Removed {} locally; provider delete failed: {}", report.id, e)
                }
                (Err(e), false) => {
                    eprintln!("Provider delete failed, {} kept: {}", report.id, e);
                    return Ok(false);
                }
                (Ok(_), false) => {}
            }
            if !manager.removes_remotely() {
                println!("Note: the file stays with the provider until it is cleaned up there.");
            }
        }
        Commands::DeleteBatch { ids } => {
            let result = manager.delete_batch(&ids).await?;
            print_json(&result)?;
            return Ok(result.is_complete_success());
        }
        Commands::Share { sub } => match sub {
            ShareCommands::Export { ids, base_url } => {
                let link = manager.share_link(&ids, base_url.as_deref()).await?;
                println!("{}", link);
            }
            ShareCommands::Import { link } => {
                let merged = manager.import_share_link(&link).await?;
                println!("Merged {} file(s)", merged);
            }
        },
        Commands::Watch => watch(&manager).await?,
    }

    manager.index().flush_pending_deletes().await;
    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if !config.is_configured() {
        eprint!("{}", setup_guidance(&config));
        return ExitCode::from(2);
    }

    let manager = match FileManager::from_config(config) {
        Ok(manager) => manager,
        Err(e) => {
            print_app_error("Configuration error", &e);
            return ExitCode::from(2);
        }
    };

    match run(manager, cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app_error) => print_app_error("Error", app_error),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
