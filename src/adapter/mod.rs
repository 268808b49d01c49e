//! Site-specific retrieval steps, one adapter per exchange

mod bse;
mod nse;

pub use bse::BseAdapter;
pub use nse::NseAdapter;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::browser::SessionFactory;
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{CompanyRequest, DocumentLink, Exchange};

/// Exchange-specific retrieval steps behind one seam, so site layout
/// changes stay inside the adapter that talks to that site.
#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Resolve the request to a site-specific locator: a company page URL
    /// on BSE, a trading symbol on NSE.
    async fn locate(&self, request: &CompanyRequest) -> Result<String, FetchError>;

    /// List candidate documents in the page's own order, most recent first.
    async fn list_filings(&self, locator: &str) -> Result<Vec<DocumentLink>, FetchError>;
}

/// Build one adapter per exchange, sharing the browser session factory.
pub fn build_adapters(
    sessions: Arc<dyn SessionFactory>,
    config: &Config,
) -> Result<Vec<Box<dyn ExchangeAdapter>>, FetchError> {
    Ok(vec![
        Box::new(BseAdapter::new(sessions.clone(), config)),
        Box::new(NseAdapter::new(sessions, config)?),
    ])
}

/// Fiscal-year label as NSE renders it ("2024-25").
pub fn fiscal_label(year: i32) -> String {
    format!("{}-{:02}", year, (year + 1) % 100)
}

/// Whether a discovered link belongs to the target year. BSE labels the
/// fiscal year by the year it ends in ("2023-24" for 2024); NSE labels it
/// by the year it starts in ("2024-25" for 2024).
pub fn matches_target_year(link: &DocumentLink, year: i32) -> bool {
    let target = year.to_string();
    match link.exchange {
        Exchange::Bse => {
            let short = format!("{:02}", year % 100);
            let label = link.title.to_lowercase();
            label.contains(&target)
                || label.contains(&format!("-{}", short))
                || label.contains(&format!("/{}", short))
        }
        Exchange::Nse => {
            let label = fiscal_label(year);
            link.title.contains(&target)
                || link.title.contains(&label)
                || link.url.contains(&target)
                || link.url.contains(&label)
        }
    }
}

/// Join a relative href against the exchange's origin.
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base, href)
    }
}

/// Filing tables render dates in a handful of formats; anything else stays
/// undated.
pub(crate) fn parse_filing_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    for format in ["%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}
