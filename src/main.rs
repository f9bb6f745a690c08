//! Locflow - Automated Catalog Metadata Localization
//!
//! Main entry point wiring configuration, the AI provider, and the
//! authenticated catalog client into the translation workflows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use locflow::catalog;
use locflow::cli::{Args, Commands};
use locflow::client::{EndpointRequest, HttpTransport, RemoteClient};
use locflow::config::Config;
use locflow::error::LocflowError;
use locflow::orchestrator::{ProgressSink, RunOptions};
use locflow::provider::{ProviderFactory, TranslationResult};
use locflow::session::SessionContext;
use locflow::workflow::LocalizationWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Locales => {
            println!("{:<10} Language", "Locale");
            println!("{}", "-".repeat(40));
            for (tag, name) in catalog::LOCALES {
                println!("{:<10} {}", tag, name);
            }
        }

        Commands::Fields => {
            println!("{:<22} {:>6}  Notes", "Field", "Limit");
            println!("{}", "-".repeat(45));
            for spec in catalog::FIELD_SPECS {
                let notes = if spec.is_keywords { "comma-separated" } else { "" };
                println!("{:<22} {:>6}  {}", spec.name, spec.max_chars, notes);
            }
        }

        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }

        Commands::Apps => {
            let client = build_client(&config)?;
            let apps = client
                .fetch_all_items(EndpointRequest::get("/v1/apps"))
                .await?;
            info!("Fetched {} apps", apps.len());
            for app in &apps {
                let id = app.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                let name = app
                    .pointer("/attributes/name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Untitled");
                println!("{:<12} {}", id, name);
            }
        }

        Commands::Translate {
            field,
            text,
            locales,
            seed,
            concurrency,
        } => {
            let target_locales = parse_locales(&locales)?;
            let provider = ProviderFactory::create(&config.translate)?;
            let client = Arc::new(build_client(&config)?);

            let mut session =
                SessionContext::new(provider, client, config.translate.refinement.clone());
            if let Some(seed) = seed {
                session = session.with_seed(seed);
            }

            let cap = if concurrency > 0 {
                concurrency
            } else {
                config.translate.concurrency
            };
            let options = RunOptions::new(cap);

            // A user interrupt stops new dispatches but lets in-flight
            // translations finish.
            let cancel = options.cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing in-flight translations");
                    cancel.cancel();
                }
            });

            let bar = ProgressBar::new(target_locales.len() as u64);
            let progress = Arc::new(BarProgress(bar.clone()));

            let workflow = LocalizationWorkflow::new(&session, options);
            let summary = workflow
                .translate_field(&text, &field, &target_locales, progress)
                .await?;
            bar.finish_and_clear();

            let mut entries: Vec<_> = summary.results.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (locale, result) in entries {
                match result {
                    TranslationResult::Success { text, char_count } => {
                        println!("{:<10} ({} chars): {}", locale, char_count, text);
                    }
                    TranslationResult::Failure { reason } => {
                        println!("{:<10} FAILED: {}", locale, reason);
                    }
                }
            }
            println!("\n{}", summary.describe());
        }
    }

    Ok(())
}

/// Progress sink driving the terminal progress bar.
struct BarProgress(ProgressBar);

impl ProgressSink for BarProgress {
    fn completed(&self, done: usize, _total: usize) {
        self.0.set_position(done as u64);
    }
}

fn build_client(config: &Config) -> Result<RemoteClient, LocflowError> {
    let credential = config.connect.credential()?;
    let transport = Arc::new(HttpTransport::new(
        config.connect.base_url.clone(),
        Duration::from_secs(config.connect.request_timeout_secs),
    )?);
    Ok(RemoteClient::new(transport, credential))
}

fn parse_locales(raw: &str) -> Result<Vec<String>, LocflowError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(catalog::LOCALES
            .iter()
            .map(|(tag, _)| tag.to_string())
            .collect());
    }

    let locales: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();
    for tag in &locales {
        if !catalog::is_supported(tag) {
            return Err(LocflowError::UnknownLocale(tag.clone()));
        }
    }
    if locales.is_empty() {
        return Err(LocflowError::Config("No target locales given".to_string()));
    }
    Ok(locales)
}

/// Console plus daily-rotated file logging under `.locflow/log/`.
///
/// The file side is non-blocking so AI request/response records never stall
/// a translation call.
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".locflow").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) = non_blocking(rolling::daily(&log_dir, "locflow.log"));
    // The writer guard must outlive every log call in the process.
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging at {} level, file output in {}",
        log_level,
        log_dir.join("locflow.log").display()
    );

    Ok(())
}
