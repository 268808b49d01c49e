use clap::{Parser, Subcommand};
use crate::models::Exchange;

#[derive(Parser)]
#[command(name = "arfetch")]
#[command(about = "Fast CLI tool for fetching BSE and NSE annual report PDFs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch annual reports for one or more companies
    Fetch {
        /// Company name, 6-digit scrip code, or exchange URL (repeatable;
        /// comma- or newline-separated lists are split)
        #[arg(short, long)]
        company: Vec<String>,

        /// File with one company identifier per line
        #[arg(short, long)]
        input: Option<String>,

        /// Exchange to search (bse, nse, both)
        #[arg(short, long, default_value = "both")]
        exchange: String,

        /// Target year (BSE: fiscal year ending this year, NSE: fiscal year starting this year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Maximum documents per company per exchange
        #[arg(short, long, default_value = "1")]
        limit: usize,

        /// Output directory
        #[arg(short, long, default_value = "./downloads")]
        output: String,
    },

    /// Classify an identifier without touching the network
    Resolve {
        /// Identifier to classify
        identifier: String,
    },
}

impl Commands {
    pub fn parse_exchanges(exchange: &str) -> Result<Vec<Exchange>, anyhow::Error> {
        match exchange.to_lowercase().as_str() {
            "bse" => Ok(vec![Exchange::Bse]),
            "nse" => Ok(vec![Exchange::Nse]),
            "both" | "all" => Ok(vec![Exchange::Bse, Exchange::Nse]),
            other => Err(anyhow::anyhow!(
                "Unsupported exchange: {}. Supported exchanges: bse, nse, both",
                other
            )),
        }
    }
}

/// Split a raw input blob into identifiers, one per line or comma-separated.
pub fn split_identifiers(raw: &str) -> Vec<String> {
    raw.lines()
        .flat_map(|line| line.split(','))
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
