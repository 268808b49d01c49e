use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

mod adapter;
mod browser;
mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod orchestrator;
mod packager;
mod resolver;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "arfetch=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "arfetch.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Fetch {
            company,
            input,
            exchange,
            year,
            limit,
            output,
        } => {
            let exchanges = Commands::parse_exchanges(exchange)?;

            let mut identifiers = Vec::new();
            for value in company {
                identifiers.extend(cli::split_identifiers(value));
            }
            if let Some(path) = input {
                let text = std::fs::read_to_string(path)?;
                identifiers.extend(cli::split_identifiers(&text));
            }
            if identifiers.is_empty() {
                anyhow::bail!("No companies given. Pass --company or --input");
            }

            info!("Starting fetch for {} company/companies", identifiers.len());

            let config = Config::from_env()?;
            config.validate()?;

            let sessions: Arc<dyn browser::SessionFactory> =
                Arc::new(browser::WebDriverFactory::new(&config));
            let adapters = adapter::build_adapters(sessions, &config)?;
            let http_fetcher = Box::new(fetcher::HttpFetcher::new(&config)?);
            let orchestrator = orchestrator::Orchestrator::new(
                adapters,
                http_fetcher,
                config.company_delay(),
                *year,
                *limit,
            );

            let batch = orchestrator.run(identifiers, &exchanges).await;

            println!(
                "Processed {} entries: {} succeeded, {} failed",
                batch.entries.len(),
                batch.succeeded(),
                batch.failed()
            );
            for entry in &batch.entries {
                let request = &entry.request;
                if entry.succeeded() {
                    println!(
                        "  ✓ {} [{}] - {} document(s)",
                        request.raw_identifier,
                        request.resolved_kind.as_str(),
                        entry.documents.len()
                    );
                } else {
                    let reasons: Vec<&str> = entry.errors.iter().map(|e| e.kind()).collect();
                    println!(
                        "  ✗ {} [{}] - {}",
                        request.raw_identifier,
                        request.resolved_kind.as_str(),
                        reasons.join(", ")
                    );
                }
            }

            match packager::package(batch.into_documents(), *year) {
                Ok(Some(deliverable)) => {
                    let path = packager::write_to_dir(&deliverable, Path::new(output))?;
                    info!("Wrote {}", path.display());
                    println!("Output: {}", path.display());
                }
                Ok(None) => warn!("No documents downloaded"),
                Err(e) => error!("Packaging failed: {}", e),
            }
        }

        Commands::Resolve { identifier } => match resolver::classify(identifier) {
            Ok(kind) => println!("{}", kind.as_str()),
            Err(e) => error!("{}", e),
        },
    }

    Ok(())
}
