//! Remote directory index: `<url>.csv` preferred, `<url>.json` as fallback.
//!
//! Both formats describe the children of one directory as `name` + `size`
//! records; size 0 marks a subdirectory. Extra columns/fields are ignored.

use crate::fetch::RetrievalChain;
use serde::{Deserialize, Deserializer};

/// One child of a remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    #[serde(deserialize_with = "size_from_number_or_string")]
    pub size: u64,
}

impl ListingEntry {
    pub fn is_dir(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("invalid CSV index: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON index: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct JsonIndex {
    content: Vec<ListingEntry>,
}

fn size_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

fn trim_leading(record: &csv::StringRecord) -> csv::StringRecord {
    record.iter().map(str::trim_start).collect()
}

/// Parses a CSV index with a header row.
///
/// Whitespace after each delimiter is skipped; trailing whitespace is part of
/// the field, so a name like `"foo "` survives unchanged.
pub fn parse_csv(text: &str) -> Result<Vec<ListingEntry>, ListingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes());
    let headers = trim_leading(reader.headers()?);
    let mut entries = Vec::new();
    for record in reader.records() {
        let entry: ListingEntry = trim_leading(&record?).deserialize(Some(&headers))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Parses a JSON index of the form `{"content": [{"name": ..., "size": ...}]}`.
pub fn parse_json(text: &str) -> Result<Vec<ListingEntry>, ListingError> {
    let index: JsonIndex = serde_json::from_str(text)?;
    Ok(index.content)
}

/// Fetches and parses the index for the directory at `url`.
///
/// Tries `<url>.csv` first; an empty body or a parse failure falls through to
/// `<url>.json`. Returns `None` when neither yields a usable index.
pub fn fetch_listing(
    chain: &RetrievalChain,
    url: &str,
    token: Option<&str>,
) -> Option<Vec<ListingEntry>> {
    let csv_url = format!("{}.csv", url);
    match chain.fetch_text(&csv_url, token) {
        Some(text) if !text.trim().is_empty() => match parse_csv(&text) {
            Ok(entries) => return Some(entries),
            Err(e) => tracing::warn!("{}: {}", csv_url, e),
        },
        _ => tracing::debug!("CSV index not available at {}", csv_url),
    }

    let json_url = format!("{}.json", url);
    match chain.fetch_text(&json_url, token) {
        Some(text) if !text.trim().is_empty() => match parse_json(&text) {
            Ok(entries) => return Some(entries),
            Err(e) => tracing::warn!("{}: {}", json_url, e),
        },
        _ => tracing::debug!("JSON index not available at {}", json_url),
    }

    tracing::error!("neither CSV nor JSON index available at: {}", url);
    None
}
