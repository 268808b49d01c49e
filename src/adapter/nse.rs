//! NSE retrieval steps: autocomplete symbol resolution over HTTP and
//! browser-driven filings extraction

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info};

use crate::adapter::{absolutize, ExchangeAdapter};
use crate::browser::{BrowserSession, SessionFactory};
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{CompanyRequest, DocumentLink, Exchange};

const HOME_URL: &str = "https://www.nseindia.com";
const AUTOCOMPLETE_URL: &str = "https://www.nseindia.com/api/search/autocomplete";
const REPORT_ANCHORS: &str = "a[href$='.pdf'], a[href$='.zip']";

fn filings_url(symbol: &str) -> String {
    format!(
        "{}/companies-listing/corporate-filings-annual-reports?symbol={}",
        HOME_URL, symbol
    )
}

/// The autocomplete endpoint answers either a bare list or an object keyed
/// by "symbols" or "data" depending on the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AutocompletePayload {
    List(Vec<Suggestion>),
    Keyed {
        #[serde(default)]
        symbols: Vec<Suggestion>,
        #[serde(default)]
        data: Vec<Suggestion>,
    },
}

impl AutocompletePayload {
    fn into_suggestions(self) -> Vec<Suggestion> {
        match self {
            AutocompletePayload::List(list) => list,
            AutocompletePayload::Keyed { symbols, data } => {
                if symbols.is_empty() {
                    data
                } else {
                    symbols
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    symbol: String,
    #[serde(rename = "companyName")]
    company_name: Option<String>,
}

pub struct NseAdapter {
    sessions: Arc<dyn SessionFactory>,
    http: reqwest::Client,
    element_timeout: Duration,
}

impl NseAdapter {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: &Config) -> Result<Self, FetchError> {
        // Cookie store is required: the API answers 401 without the session
        // cookie handed out by the home page.
        let http = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .cookie_store(true)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            sessions,
            http,
            element_timeout: config.element_timeout(),
        })
    }

    /// Resolve an identifier to a trading symbol via the public
    /// autocomplete endpoint, warming up the session cookie first.
    pub async fn resolve_symbol(&self, identifier: &str) -> Result<String, FetchError> {
        info!("[NSE] Searching for '{}'", identifier);

        let _ = self
            .http
            .get(HOME_URL)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let payload: AutocompletePayload = self
            .http
            .get(AUTOCOMPLETE_URL)
            .query(&[("q", identifier)])
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .json()
            .await?;

        let suggestion = payload
            .into_suggestions()
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(identifier.to_string()))?;

        info!(
            "[NSE] Found: {} ({})",
            suggestion.company_name.as_deref().unwrap_or(&suggestion.symbol),
            suggestion.symbol
        );
        Ok(suggestion.symbol)
    }

    async fn list_in(
        &self,
        session: &mut dyn BrowserSession,
        symbol: &str,
    ) -> Result<Vec<DocumentLink>, FetchError> {
        // Home page first: the filings page 403s without the site cookies.
        session.navigate(HOME_URL).await?;
        session.navigate(&filings_url(symbol)).await?;
        session.wait_for(REPORT_ANCHORS, self.element_timeout).await?;
        let html = session.page_source().await?;
        let links = extract_report_links(&html);
        info!("[NSE] Extracted {} report link(s)", links.len());
        Ok(links)
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for NseAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Nse
    }

    async fn locate(&self, request: &CompanyRequest) -> Result<String, FetchError> {
        let raw = request.raw_identifier.trim();
        if let Some(symbol) = symbol_from_url(raw) {
            return Ok(symbol);
        }
        self.resolve_symbol(raw).await
    }

    async fn list_filings(&self, locator: &str) -> Result<Vec<DocumentLink>, FetchError> {
        let mut session = self.sessions.launch().await?;
        let listed = self.list_in(session.as_mut(), locator).await;
        if let Err(e) = session.close().await {
            debug!("[NSE] Session close failed: {}", e);
        }
        listed
    }
}

/// A pasted filings URL already carries the symbol as a query parameter.
pub(crate) fn symbol_from_url(input: &str) -> Option<String> {
    if !input.contains("nseindia.com") {
        return None;
    }
    let pattern = Regex::new(r"[?&]symbol=([^&\s]+)").unwrap();
    pattern.captures(input).map(|captures| captures[1].to_string())
}

/// Collect every PDF/ZIP anchor on the rendered filings page, in page
/// order.
pub(crate) fn extract_report_links(html: &str) -> Vec<DocumentLink> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse(REPORT_ANCHORS).unwrap();

    let mut links = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        let text = anchor.text().collect::<Vec<_>>().join(" ").trim().to_string();
        let title = if text.is_empty() {
            href.rsplit('/').next().unwrap_or(href).to_string()
        } else {
            text
        };
        links.push(DocumentLink {
            exchange: Exchange::Nse,
            url: absolutize(HOME_URL, href),
            title,
            filing_date: None,
        });
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autocomplete_bare_list_payload() {
        let json = r#"[{"symbol": "RELIANCE", "companyName": "Reliance Industries Limited"}]"#;
        let payload: AutocompletePayload = serde_json::from_str(json).unwrap();
        let suggestions = payload.into_suggestions();
        assert_eq!(suggestions[0].symbol, "RELIANCE");
        assert_eq!(
            suggestions[0].company_name.as_deref(),
            Some("Reliance Industries Limited")
        );
    }

    #[test]
    fn test_autocomplete_keyed_payload() {
        let json = r#"{"symbols": [{"symbol": "TCS", "companyName": "Tata Consultancy Services"}]}"#;
        let payload: AutocompletePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.into_suggestions()[0].symbol, "TCS");

        let json = r#"{"data": [{"symbol": "INFY"}]}"#;
        let payload: AutocompletePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.into_suggestions()[0].symbol, "INFY");
    }

    #[test]
    fn test_autocomplete_empty_payload() {
        let payload: AutocompletePayload = serde_json::from_str("[]").unwrap();
        assert!(payload.into_suggestions().is_empty());

        let payload: AutocompletePayload = serde_json::from_str(r#"{"symbols": []}"#).unwrap();
        assert!(payload.into_suggestions().is_empty());
    }

    #[test]
    fn test_symbol_from_url() {
        assert_eq!(
            symbol_from_url(
                "https://www.nseindia.com/companies-listing/corporate-filings-annual-reports?symbol=TCS"
            ),
            Some("TCS".to_string())
        );
        assert_eq!(
            symbol_from_url("https://www.nseindia.com/get-quotes/equity?x=1&symbol=M-M"),
            Some("M-M".to_string())
        );
        assert_eq!(symbol_from_url("https://www.nseindia.com"), None);
        assert_eq!(symbol_from_url("Reliance Industries"), None);
    }

    #[test]
    fn test_extract_report_links() {
        let html = r#"
            <html><body>
            <a href="/annual_reports/AR_TCS_2024-25.pdf">TCS Annual Report 2024-25</a>
            <a href="https://archives.nseindia.com/annual_reports/AR_TCS_2023-24.zip"></a>
            <a href="/about-us">Not a report</a>
            </body></html>"#;
        let links = extract_report_links(html);
        assert_eq!(links.len(), 2);

        assert_eq!(
            links[0].url,
            "https://www.nseindia.com/annual_reports/AR_TCS_2024-25.pdf"
        );
        assert_eq!(links[0].title, "TCS Annual Report 2024-25");

        // Anchor with no text falls back to the file name
        assert_eq!(links[1].title, "AR_TCS_2023-24.zip");
        assert_eq!(
            links[1].url,
            "https://archives.nseindia.com/annual_reports/AR_TCS_2023-24.zip"
        );
    }
}
