use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    Bse,
    Nse,
}

impl Exchange {
    pub fn as_str(&self) -> &str {
        match self {
            Exchange::Bse => "BSE",
            Exchange::Nse => "NSE",
        }
    }
}

/// What a raw user identifier turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    Name,
    ScripCode,
    Url,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &str {
        match self {
            IdentifierKind::Name => "name",
            IdentifierKind::ScripCode => "scrip-code",
            IdentifierKind::Url => "url",
        }
    }
}

/// One queued batch entry. Immutable once queued.
#[derive(Debug, Clone)]
pub struct CompanyRequest {
    pub raw_identifier: String,
    pub resolved_kind: IdentifierKind,
    pub exchanges: Vec<Exchange>,
}

/// A candidate document discovered by an exchange adapter. The url is
/// always non-empty; consumed immediately by the fetcher, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLink {
    pub exchange: Exchange,
    pub url: String,
    pub title: String,
    pub filing_date: Option<NaiveDate>,
}

/// A downloaded document held in memory until packaging. Content is
/// non-empty on success; zero-byte downloads are rejected by the fetcher.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub filename: String,
    pub content: Vec<u8>,
    pub source: DocumentLink,
}

/// Progress of a single batch entry through the retrieval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Resolving,
    Searching,
    Fetching,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Pending => "pending",
            Stage::Resolving => "resolving",
            Stage::Searching => "searching",
            Stage::Fetching => "fetching",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

/// Everything that happened for one queued company.
#[derive(Debug)]
pub struct EntryOutcome {
    pub request: CompanyRequest,
    pub documents: Vec<FetchedDocument>,
    pub errors: Vec<FetchError>,
}

impl EntryOutcome {
    /// An entry counts as done when at least one document came back, even
    /// if one of the selected exchanges failed (partial success).
    pub fn succeeded(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn stage(&self) -> Stage {
        if self.succeeded() {
            Stage::Done
        } else {
            Stage::Failed
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub entries: Vec<EntryOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Drain every fetched document for packaging, in entry order.
    pub fn into_documents(self) -> Vec<FetchedDocument> {
        self.entries
            .into_iter()
            .flat_map(|entry| entry.documents)
            .collect()
    }
}
