//! Plain-HTTP document download with batch-scoped filename allocation

use std::collections::HashMap;

use regex::Regex;
use reqwest::header::REFERER;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{DocumentLink, FetchedDocument};

#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(
        &self,
        link: &DocumentLink,
        names: &mut FilenameAllocator,
    ) -> Result<FetchedDocument, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(config.download_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(
        &self,
        link: &DocumentLink,
        names: &mut FilenameAllocator,
    ) -> Result<FetchedDocument, FetchError> {
        debug!("Downloading {}", link.url);

        let response = self
            .client
            .get(&link.url)
            .header(REFERER, referer_for(&link.url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::DownloadFailed {
                url: link.url.clone(),
                reason: format!("HTTP status {}", status),
            });
        }

        let content = response.bytes().await?;
        if content.is_empty() {
            return Err(FetchError::DownloadFailed {
                url: link.url.clone(),
                reason: "empty response body".to_string(),
            });
        }

        let filename = names.allocate(&derive_filename(link));
        info!(
            "✓ Downloaded {} ({:.2} MB)",
            filename,
            content.len() as f64 / 1_048_576.0
        );

        Ok(FetchedDocument {
            filename,
            content: content.to_vec(),
            source: link.clone(),
        })
    }
}

/// Both exchanges check the Referer on their document hosts.
fn referer_for(url: &str) -> &'static str {
    if url.contains("nseindia") {
        "https://www.nseindia.com/"
    } else if url.contains("bseindia") {
        "https://www.bseindia.com/"
    } else {
        "https://www.google.com/"
    }
}

/// Strip characters invalid in filenames on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let invalid = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
    invalid.replace_all(name, "_").trim().to_string()
}

/// Exchange tag plus sanitized title, extension taken from the URL.
pub fn derive_filename(link: &DocumentLink) -> String {
    let extension = if link.url.to_lowercase().ends_with(".zip") {
        "zip"
    } else {
        "pdf"
    };
    let stem = sanitize_filename(&format!("{}_{}", link.exchange.as_str(), link.title));
    format!("{}.{}", stem, extension)
}

/// Deduplicates filenames within one batch by suffixing a counter before
/// the extension.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    taken: HashMap<String, usize>,
}

impl FilenameAllocator {
    pub fn allocate(&mut self, candidate: &str) -> String {
        let count = self.taken.entry(candidate.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return candidate.to_string();
        }

        let suffix = *count - 1;
        let suffixed = match candidate.rsplit_once('.') {
            Some((stem, extension)) => format!("{}_{}.{}", stem, suffix, extension),
            None => format!("{}_{}", candidate, suffix),
        };
        // The suffixed name can itself already be taken
        if self.taken.contains_key(&suffixed) {
            self.allocate(&suffixed)
        } else {
            self.taken.insert(suffixed.clone(), 1);
            suffixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exchange;

    fn link(title: &str, url: &str) -> DocumentLink {
        DocumentLink {
            exchange: Exchange::Bse,
            url: url.to_string(),
            title: title.to_string(),
            filing_date: None,
        }
    }

    #[test]
    fn test_sanitize_filename_strips_invalid_characters() {
        assert_eq!(
            sanitize_filename(r#"Annual Report: FY23/24 <final>?"#),
            "Annual Report_ FY23_24 _final__"
        );
        assert_eq!(sanitize_filename("  plain name  "), "plain name");
    }

    #[test]
    fn test_derive_filename_takes_extension_from_url() {
        let pdf = link(
            "Annual Report 2023-24",
            "https://www.bseindia.com/AttachHis/abc.pdf",
        );
        assert_eq!(derive_filename(&pdf), "BSE_Annual Report 2023-24.pdf");

        let zip = link(
            "Annual Report 2023-24",
            "https://archives.nseindia.com/AR.ZIP",
        );
        assert_eq!(derive_filename(&zip), "BSE_Annual Report 2023-24.zip");
    }

    #[test]
    fn test_allocator_resolves_collisions() {
        let mut names = FilenameAllocator::default();
        assert_eq!(names.allocate("BSE_Report.pdf"), "BSE_Report.pdf");
        assert_eq!(names.allocate("BSE_Report.pdf"), "BSE_Report_1.pdf");
        assert_eq!(names.allocate("BSE_Report.pdf"), "BSE_Report_2.pdf");
        assert_eq!(names.allocate("NSE_Report.pdf"), "NSE_Report.pdf");
    }

    #[test]
    fn test_allocator_skips_names_already_taken() {
        let mut names = FilenameAllocator::default();
        assert_eq!(names.allocate("Report_1.pdf"), "Report_1.pdf");
        assert_eq!(names.allocate("Report.pdf"), "Report.pdf");
        // The natural suffix collides with an allocated name
        assert_eq!(names.allocate("Report.pdf"), "Report_1_1.pdf");
    }

    #[test]
    fn test_allocator_without_extension() {
        let mut names = FilenameAllocator::default();
        assert_eq!(names.allocate("report"), "report");
        assert_eq!(names.allocate("report"), "report_1");
    }
}
