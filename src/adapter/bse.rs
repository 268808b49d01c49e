//! BSE retrieval steps: quote-search discovery and annual-report table
//! extraction

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::adapter::{absolutize, parse_filing_date, ExchangeAdapter};
use crate::browser::{BrowserSession, SessionFactory};
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{CompanyRequest, DocumentLink, Exchange, IdentifierKind};

const BASE_URL: &str = "https://www.bseindia.com";
const QUOTE_SEARCH_URL: &str = "https://www.bseindia.com/getquote.aspx";
const SEARCH_BOX: &str = "input#ContentPlaceHolder1_SmartSearch_smartSearch";
const SUGGESTION_LINKS: &str = "#ajax_response_smart li a";
const SHARE_PRICE_PATTERN: &str = r"/stock-share-price/([^/]+)/([^/]+)/(\d+)/";
// Paths BSE serves annual reports from, plus plain PDF targets.
const REPORT_PATH_MARKERS: [&str; 4] = [".pdf", "/attachhis/", "/annualreport/", "/histannr/"];

pub struct BseAdapter {
    sessions: Arc<dyn SessionFactory>,
    element_timeout: Duration,
}

impl BseAdapter {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: &Config) -> Self {
        Self {
            sessions,
            element_timeout: config.element_timeout(),
        }
    }

    /// Drive the quote-search page for a company name: type into the smart
    /// search box, prefer an autocomplete suggestion carrying a scrip code,
    /// fall back to submitting the form and reading the landed URL.
    async fn search(&self, name: &str) -> Result<String, FetchError> {
        info!("[BSE] Searching for '{}'", name);
        let mut session = self.sessions.launch().await?;
        let found = self.search_in(session.as_mut(), name).await;
        if let Err(e) = session.close().await {
            debug!("[BSE] Session close failed: {}", e);
        }
        found
    }

    async fn search_in(
        &self,
        session: &mut dyn BrowserSession,
        name: &str,
    ) -> Result<String, FetchError> {
        session.navigate(QUOTE_SEARCH_URL).await?;
        session.wait_for(SEARCH_BOX, self.element_timeout).await?;

        // The smart-search box chokes on very long inputs
        let typed: String = name.chars().take(30).collect();
        session.type_into(SEARCH_BOX, &typed).await?;

        if session
            .wait_for(SUGGESTION_LINKS, self.element_timeout)
            .await
            .is_ok()
        {
            let html = session.page_source().await?;
            if let Some(hit) = first_suggestion(&html) {
                info!("[BSE] Found: {} ({})", hit.name, hit.code);
                return Ok(annual_reports_url("company", "symbol", &hit.code));
            }
        }

        // No usable suggestion; submit the form and hope for a direct
        // navigation to the company page.
        session.press_enter(SEARCH_BOX).await?;
        session.wait_for("body", self.element_timeout).await?;
        let landed = session.current_url().await?;
        company_page_from_url(&landed).ok_or_else(|| FetchError::NotFound(name.to_string()))
    }

    async fn list_in(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Vec<DocumentLink>, FetchError> {
        session.navigate(url).await?;
        session.wait_for("table", self.element_timeout).await?;
        let html = session.page_source().await?;
        let links = extract_report_links(&html);
        info!("[BSE] Extracted {} report link(s)", links.len());
        Ok(links)
    }
}

#[async_trait::async_trait]
impl ExchangeAdapter for BseAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bse
    }

    async fn locate(&self, request: &CompanyRequest) -> Result<String, FetchError> {
        let raw = request.raw_identifier.trim();
        if let Some(page) = company_page_from_url(raw) {
            return Ok(page);
        }
        if request.resolved_kind == IdentifierKind::ScripCode {
            return Ok(annual_reports_url("company", "symbol", raw));
        }
        self.search(raw).await
    }

    async fn list_filings(&self, locator: &str) -> Result<Vec<DocumentLink>, FetchError> {
        let mut session = self.sessions.launch().await?;
        let listed = self.list_in(session.as_mut(), locator).await;
        if let Err(e) = session.close().await {
            debug!("[BSE] Session close failed: {}", e);
        }
        listed
    }
}

pub(crate) struct SuggestionHit {
    pub code: String,
    pub name: String,
}

/// Pick the first autocomplete entry carrying a scrip code; the code is
/// the last 6-digit number in the entry text, the name its first line.
pub(crate) fn first_suggestion(html: &str) -> Option<SuggestionHit> {
    let document = Html::parse_document(html);
    let links = Selector::parse(SUGGESTION_LINKS).unwrap();
    let code = Regex::new(r"\d{6}").unwrap();

    for link in document.select(&links) {
        let text = link.text().collect::<Vec<_>>().join("\n");
        if let Some(hit) = code.find_iter(&text).last() {
            let name = text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("")
                .to_string();
            return Some(SuggestionHit {
                code: hit.as_str().to_string(),
                name,
            });
        }
    }
    None
}

/// Parse a stock-share-price URL into the company's annual-reports page.
pub(crate) fn company_page_from_url(input: &str) -> Option<String> {
    if !input.contains("bseindia.com/stock-share-price/") {
        return None;
    }
    let pattern = Regex::new(SHARE_PRICE_PATTERN).unwrap();
    let captures = pattern.captures(input)?;
    Some(annual_reports_url(&captures[1], &captures[2], &captures[3]))
}

pub(crate) fn annual_reports_url(slug: &str, symbol: &str, code: &str) -> String {
    format!(
        "{}/stock-share-price/{}/{}/{}/financials-annual-reports/",
        BASE_URL, slug, symbol, code
    )
}

/// Pull annual-report rows out of the rendered financials page. The page
/// carries several tables; the reports live in the last one with a Year
/// column. One link per row, first match wins.
pub(crate) fn extract_report_links(html: &str) -> Vec<DocumentLink> {
    let document = Html::parse_document(html);
    let tables = Selector::parse("table").unwrap();
    let rows = Selector::parse("tr").unwrap();
    let cells = Selector::parse("td").unwrap();
    let anchors = Selector::parse("a[href]").unwrap();

    let mut links = Vec::new();
    let table = document
        .select(&tables)
        .filter(|table| table.text().any(|text| text.contains("Year")))
        .last()
        .or_else(|| document.select(&tables).last());
    let Some(table) = table else {
        return links;
    };

    for row in table.select(&rows) {
        let row_cells: Vec<String> = row
            .select(&cells)
            .map(|cell| cell.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .collect();
        let Some(period) = row_cells.first() else {
            continue;
        };
        if period.is_empty() || !period.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        let filing_date = row_cells.iter().find_map(|cell| parse_filing_date(cell));

        for anchor in row.select(&anchors) {
            let href = anchor.value().attr("href").unwrap_or("");
            let lower = href.to_lowercase();
            if REPORT_PATH_MARKERS.iter().any(|marker| lower.contains(marker)) {
                links.push(DocumentLink {
                    exchange: Exchange::Bse,
                    url: absolutize(BASE_URL, href),
                    title: format!("Annual Report {}", period),
                    filing_date,
                });
                break;
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SUGGESTIONS_PAGE: &str = r##"
        <html><body>
        <ul id="ajax_response_smart">
            <li><a href="#">Reliance Industries Ltd<br>INE002A01018 500325</a></li>
            <li><a href="#">Reliance Power Ltd<br>INE614G01033 532939</a></li>
        </ul>
        </body></html>"##;

    const FINANCIALS_PAGE: &str = r#"
        <html><body>
        <table><tr><td>Open</td><td>High</td></tr></table>
        <table>
            <tr><td>Year</td><td>Submission Date</td><td>Report</td></tr>
            <tr>
                <td>2023-2024</td>
                <td>15-07-2024</td>
                <td><a href="/xml-data/AttachHis/abc123.pdf">Download</a></td>
            </tr>
            <tr>
                <td>2022-2023</td>
                <td>11-07-2023</td>
                <td><a href="https://www.bseindia.com/AnnualReport/def456.pdf">Download</a></td>
            </tr>
            <tr>
                <td></td>
                <td><a href="/should-be-skipped.pdf">No period</a></td>
            </tr>
            <tr>
                <td>2021-2022</td>
                <td><a href="/bseplus/quarterly.xls">Wrong format</a></td>
            </tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_first_suggestion_takes_last_code_in_entry() {
        let hit = first_suggestion(SUGGESTIONS_PAGE).unwrap();
        assert_eq!(hit.code, "500325");
        assert_eq!(hit.name, "Reliance Industries Ltd");
    }

    #[test]
    fn test_first_suggestion_without_codes() {
        let html = r#"<ul id="ajax_response_smart"><li><a>No codes here</a></li></ul>"#;
        assert!(first_suggestion(html).is_none());
    }

    #[test]
    fn test_company_page_from_url() {
        let url =
            "https://www.bseindia.com/stock-share-price/reliance-industries-ltd/RELIANCE/500325/";
        assert_eq!(
            company_page_from_url(url).unwrap(),
            "https://www.bseindia.com/stock-share-price/reliance-industries-ltd/RELIANCE/500325/financials-annual-reports/"
        );
        assert!(company_page_from_url("Reliance Industries").is_none());
        assert!(company_page_from_url("https://www.bseindia.com/getquote.aspx").is_none());
    }

    #[test]
    fn test_extract_report_links_from_financials_table() {
        let links = extract_report_links(FINANCIALS_PAGE);
        assert_eq!(links.len(), 2);

        assert_eq!(
            links[0].url,
            "https://www.bseindia.com/xml-data/AttachHis/abc123.pdf"
        );
        assert_eq!(links[0].title, "Annual Report 2023-2024");
        assert_eq!(
            links[0].filing_date,
            Some(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
        );

        // Absolute hrefs pass through untouched
        assert_eq!(
            links[1].url,
            "https://www.bseindia.com/AnnualReport/def456.pdf"
        );
    }

    #[test]
    fn test_extract_report_links_without_tables() {
        assert!(extract_report_links("<html><body>maintenance</body></html>").is_empty());
    }
}
