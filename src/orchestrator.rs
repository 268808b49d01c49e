//! Sequential batch processing with anti-burst pacing between companies

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::adapter::{matches_target_year, ExchangeAdapter};
use crate::error::FetchError;
use crate::fetcher::{DocumentFetcher, FilenameAllocator};
use crate::models::{
    BatchResult, CompanyRequest, DocumentLink, EntryOutcome, Exchange, IdentifierKind, Stage,
};
use crate::resolver;

pub struct Orchestrator {
    adapters: Vec<Box<dyn ExchangeAdapter>>,
    fetcher: Box<dyn DocumentFetcher>,
    pacing: Duration,
    target_year: Option<i32>,
    per_exchange_limit: usize,
}

impl Orchestrator {
    pub fn new(
        adapters: Vec<Box<dyn ExchangeAdapter>>,
        fetcher: Box<dyn DocumentFetcher>,
        pacing: Duration,
        target_year: Option<i32>,
        per_exchange_limit: usize,
    ) -> Self {
        Self {
            adapters,
            fetcher,
            pacing,
            target_year,
            per_exchange_limit: per_exchange_limit.max(1),
        }
    }

    /// Process every queued identifier strictly in order. A failed entry
    /// never aborts the batch, and the pacing delay runs between entries
    /// regardless of outcome.
    pub async fn run(&self, identifiers: Vec<String>, selection: &[Exchange]) -> BatchResult {
        let total = identifiers.len();
        debug!(stage = Stage::Pending.as_str(), "{} entries queued", total);

        let mut names = FilenameAllocator::default();
        let mut batch = BatchResult::default();

        for (index, raw) in identifiers.into_iter().enumerate() {
            if index > 0 {
                debug!("Pacing {}s before next company", self.pacing.as_secs());
                sleep(self.pacing).await;
            }

            info!("Processing company {}/{}: {}", index + 1, total, raw);
            let outcome = self.process_entry(raw, selection, &mut names).await;
            match outcome.stage() {
                Stage::Done => info!(
                    "✓ {}: {} document(s)",
                    outcome.request.raw_identifier,
                    outcome.documents.len()
                ),
                _ => warn!(
                    "✗ {}: {}",
                    outcome.request.raw_identifier,
                    outcome
                        .errors
                        .iter()
                        .map(|e| e.kind())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }
            batch.entries.push(outcome);
        }

        batch
    }

    async fn process_entry(
        &self,
        raw: String,
        selection: &[Exchange],
        names: &mut FilenameAllocator,
    ) -> EntryOutcome {
        debug!(stage = Stage::Resolving.as_str(), "classifying '{}'", raw);
        let kind = match resolver::classify(&raw) {
            Ok(kind) => kind,
            Err(e) => {
                return EntryOutcome {
                    request: CompanyRequest {
                        raw_identifier: raw,
                        resolved_kind: IdentifierKind::Name,
                        exchanges: selection.to_vec(),
                    },
                    documents: Vec::new(),
                    errors: vec![e],
                }
            }
        };

        // A pasted exchange URL pins the entry to that site.
        let exchanges = match kind {
            IdentifierKind::Url => resolver::exchange_for_url(&raw)
                .map(|exchange| vec![exchange])
                .unwrap_or_else(|| selection.to_vec()),
            _ => selection.to_vec(),
        };

        let request = CompanyRequest {
            raw_identifier: raw,
            resolved_kind: kind,
            exchanges,
        };
        let mut documents = Vec::new();
        let mut errors = Vec::new();

        if request.exchanges.is_empty() {
            errors.push(FetchError::InvalidIdentifier);
            return EntryOutcome {
                request,
                documents,
                errors,
            };
        }

        for &exchange in &request.exchanges {
            let Some(adapter) = self.adapters.iter().find(|a| a.exchange() == exchange) else {
                warn!("No adapter configured for {}", exchange.as_str());
                continue;
            };

            match self.discover(adapter.as_ref(), &request).await {
                Ok(links) => {
                    debug!(
                        stage = Stage::Fetching.as_str(),
                        "{} link(s) selected from {}",
                        links.len(),
                        exchange.as_str()
                    );
                    for link in links {
                        match self.fetcher.fetch(&link, names).await {
                            Ok(document) => documents.push(document),
                            Err(e) => {
                                warn!("[{}] {}", exchange.as_str(), e);
                                errors.push(e);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("[{}] {}", exchange.as_str(), e);
                    errors.push(e);
                }
            }
        }

        EntryOutcome {
            request,
            documents,
            errors,
        }
    }

    /// Locate the company on one exchange and pick the links to download,
    /// applying the target-year filter and the per-exchange limit.
    async fn discover(
        &self,
        adapter: &dyn ExchangeAdapter,
        request: &CompanyRequest,
    ) -> Result<Vec<DocumentLink>, FetchError> {
        debug!(
            stage = Stage::Searching.as_str(),
            "locating '{}' on {}",
            request.raw_identifier,
            adapter.exchange().as_str()
        );
        let locator = adapter.locate(request).await?;
        let links = adapter.list_filings(&locator).await?;

        let selected: Vec<DocumentLink> = links
            .into_iter()
            .filter(|link| {
                self.target_year
                    .map_or(true, |year| matches_target_year(link, year))
            })
            .take(self.per_exchange_limit)
            .collect();

        if selected.is_empty() {
            return Err(FetchError::NotFound(request.raw_identifier.clone()));
        }
        Ok(selected)
    }
}
