//! Offline classification of user-supplied company identifiers

use regex::Regex;

use crate::error::FetchError;
use crate::models::{Exchange, IdentifierKind};

/// Classify a raw identifier without touching the network. Anything that is
/// neither a scrip code nor a recognized exchange URL falls back to a name
/// search downstream.
pub fn classify(raw: &str) -> Result<IdentifierKind, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidIdentifier);
    }

    let scrip_code = Regex::new(r"^\d{6}$").unwrap();
    if scrip_code.is_match(trimmed) {
        return Ok(IdentifierKind::ScripCode);
    }

    if exchange_for_url(trimmed).is_some() {
        return Ok(IdentifierKind::Url);
    }

    Ok(IdentifierKind::Name)
}

/// A pasted exchange URL pins the entry to that exchange; searching the
/// other site for a URL string only produces noise.
pub fn exchange_for_url(raw: &str) -> Option<Exchange> {
    let lower = raw.to_lowercase();
    if lower.contains("bseindia.com") {
        Some(Exchange::Bse)
    } else if lower.contains("nseindia.com") {
        Some(Exchange::Nse)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_digit_codes_classify_as_scrip_code() {
        assert_eq!(classify("500325").unwrap(), IdentifierKind::ScripCode);
        assert_eq!(classify(" 532540 ").unwrap(), IdentifierKind::ScripCode);
        // Five or seven digits are not scrip codes
        assert_eq!(classify("50032").unwrap(), IdentifierKind::Name);
        assert_eq!(classify("5003250").unwrap(), IdentifierKind::Name);
    }

    #[test]
    fn test_exchange_urls_classify_as_url() {
        assert_eq!(
            classify("https://www.bseindia.com/stock-share-price/reliance-industries-ltd/RELIANCE/500325/")
                .unwrap(),
            IdentifierKind::Url
        );
        assert_eq!(
            classify("https://www.nseindia.com/companies-listing/corporate-filings-annual-reports?symbol=TCS")
                .unwrap(),
            IdentifierKind::Url
        );
    }

    #[test]
    fn test_everything_else_classifies_as_name() {
        assert_eq!(classify("Reliance Industries").unwrap(), IdentifierKind::Name);
        assert_eq!(classify("HCL").unwrap(), IdentifierKind::Name);
        assert_eq!(classify("https://example.com/filings").unwrap(), IdentifierKind::Name);
    }

    #[test]
    fn test_empty_and_whitespace_are_rejected() {
        assert!(matches!(classify(""), Err(FetchError::InvalidIdentifier)));
        assert!(matches!(classify("   \t\n"), Err(FetchError::InvalidIdentifier)));
    }

    #[test]
    fn test_url_exchange_narrowing() {
        assert_eq!(
            exchange_for_url("https://www.bseindia.com/stock-share-price/x/Y/500325/"),
            Some(Exchange::Bse)
        );
        assert_eq!(
            exchange_for_url("https://www.nseindia.com/get-quotes/equity?symbol=TCS"),
            Some(Exchange::Nse)
        );
        assert_eq!(exchange_for_url("Reliance Industries"), None);
    }
}
