//! HTTP remote source
//!
//! Talks to a JSON collection endpoint:
//! - `GET <url>` returns an array of records
//! - `POST <url>` creates a record and echoes it back with its `id`
//!
//! Records carry `id` (number or string), `text` or `title`, and an
//! optional `category`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{NetworkError, RemoteSnapshot, RemoteSource};
use crate::config::Config;
use crate::models::Entry;

/// Remote record as sent by the server
#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Body of a create request
#[derive(Debug, Serialize)]
struct WireSubmit<'a> {
    title: &'a str,
    body: &'a str,
    category: &'a str,
}

/// `RemoteSource` over HTTP
pub struct HttpRemoteSource {
    client: reqwest::Client,
    url: String,
    fetch_limit: usize,
    default_category: String,
}

impl HttpRemoteSource {
    /// Create a source for the given endpoint
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        fetch_limit: usize,
        default_category: impl Into<String>,
    ) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            fetch_limit,
            default_category: default_category.into(),
        })
    }

    /// Create a source from configuration
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        let Some(ref url) = config.remote_url else {
            return Err(NetworkError::Unavailable(
                "remote_url is not configured".to_string(),
            ));
        };
        Self::new(
            url,
            config.request_timeout(),
            config.fetch_limit,
            &config.default_category,
        )
    }

    /// The endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, NetworkError> {
        debug!("Fetching remote snapshot from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        let snapshot = normalize_snapshot(
            &body,
            self.fetch_limit,
            &self.default_category,
            Utc::now(),
        )?;

        info!(
            "Fetched {} remote entries (has_more={})",
            snapshot.entries.len(),
            snapshot.has_more
        );
        Ok(snapshot)
    }

    async fn submit(&self, entry: &Entry) -> Result<Entry, NetworkError> {
        let body = serde_json::to_vec(&WireSubmit {
            title: &entry.text,
            body: &entry.text,
            category: &entry.category,
        })
        .map_err(|e| NetworkError::Request(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }

        let text = response.text().await.map_err(map_reqwest_error)?;
        let remote_id = parse_created_id(&text)?;

        info!("Submitted entry {} as remote {}", entry.local_id, remote_id);
        let mut submitted = entry.clone();
        submitted.remote_id = Some(remote_id);
        Ok(submitted)
    }
}

/// Turn a response body into a snapshot
///
/// Records without an `id` or with blank text are skipped. At most `limit`
/// entries are kept; `has_more` reports whether any were left over.
fn normalize_snapshot(
    body: &str,
    limit: usize,
    default_category: &str,
    fetched_at: DateTime<Utc>,
) -> Result<RemoteSnapshot, NetworkError> {
    let records: Vec<WireRecord> =
        serde_json::from_str(body).map_err(|e| NetworkError::Malformed(e.to_string()))?;

    let mut entries = Vec::new();
    let mut has_more = false;

    for record in records {
        let Some(remote_id) = record.id.as_ref().and_then(id_to_string) else {
            warn!("Skipping remote record without an id");
            continue;
        };
        let text = record
            .text
            .filter(|t| !t.trim().is_empty())
            .or(record.title)
            .unwrap_or_default();
        let category = record
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_category.to_string());

        match Entry::from_remote(&remote_id, &text, &category, fetched_at) {
            Ok(entry) => {
                if entries.len() == limit {
                    has_more = true;
                    break;
                }
                entries.push(entry);
            }
            Err(e) => warn!("Skipping remote record {}: {}", remote_id, e),
        }
    }

    Ok(RemoteSnapshot { entries, has_more })
}

/// Read the `id` out of a create response
fn parse_created_id(body: &str) -> Result<String, NetworkError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| NetworkError::Malformed(e.to_string()))?;
    value
        .get("id")
        .and_then(id_to_string)
        .ok_or_else(|| NetworkError::Malformed("create response has no id".to_string()))
}

fn id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn map_reqwest_error(error: reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout
    } else if error.is_connect() {
        NetworkError::Unavailable(error.to_string())
    } else if error.is_decode() || error.is_body() {
        NetworkError::Malformed(error.to_string())
    } else {
        NetworkError::Request(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_and_title() {
        let body = r#"[
            {"id": 1, "text": "First", "category": "Wisdom"},
            {"id": "2", "title": "Second", "body": "ignored", "userId": 1}
        ]"#;
        let now = Utc::now();
        let snapshot = normalize_snapshot(body, 10, "Remote", now).unwrap();

        assert_eq!(snapshot.entries.len(), 2);
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.entries[0].remote_id.as_deref(), Some("1"));
        assert_eq!(snapshot.entries[0].category, "Wisdom");
        assert_eq!(snapshot.entries[1].text, "Second");
        assert_eq!(snapshot.entries[1].category, "Remote");
        assert_eq!(snapshot.entries[1].last_modified, now);
    }

    #[test]
    fn test_normalize_skips_unusable_records() {
        let body = r#"[
            {"text": "no id"},
            {"id": 3, "text": "   "},
            {"id": null, "text": "null id"},
            {"id": 4, "text": "kept"}
        ]"#;
        let snapshot = normalize_snapshot(body, 10, "Remote", Utc::now()).unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].remote_id.as_deref(), Some("4"));
    }

    #[test]
    fn test_normalize_reports_truncation() {
        let body = r#"[{"id": 1, "text": "a"}, {"id": 2, "text": "b"}, {"id": 3, "text": "c"}]"#;
        let snapshot = normalize_snapshot(body, 2, "Remote", Utc::now()).unwrap();
        assert_eq!(snapshot.entries.len(), 2);
        assert!(snapshot.has_more);

        let snapshot = normalize_snapshot(body, 3, "Remote", Utc::now()).unwrap();
        assert!(!snapshot.has_more);
    }

    #[test]
    fn test_normalize_malformed() {
        let err = normalize_snapshot(r#"{"id": 1}"#, 10, "Remote", Utc::now()).unwrap_err();
        assert!(matches!(err, NetworkError::Malformed(_)));

        let err = normalize_snapshot("<html>", 10, "Remote", Utc::now()).unwrap_err();
        assert!(matches!(err, NetworkError::Malformed(_)));
    }

    #[test]
    fn test_parse_created_id() {
        assert_eq!(parse_created_id(r#"{"id": 101}"#).unwrap(), "101");
        assert_eq!(parse_created_id(r#"{"id": "abc"}"#).unwrap(), "abc");
        assert!(matches!(
            parse_created_id(r#"{"title": "x"}"#),
            Err(NetworkError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = Config::default();
        assert!(matches!(
            HttpRemoteSource::from_config(&config),
            Err(NetworkError::Unavailable(_))
        ));

        let config = Config {
            remote_url: Some("http://localhost:3000/quotes".to_string()),
            ..Config::default()
        };
        let source = HttpRemoteSource::from_config(&config).unwrap();
        assert_eq!(source.url(), "http://localhost:3000/quotes");
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_network_error() {
        // Port 9 (discard) is not listening on test machines
        let source =
            HttpRemoteSource::new("http://127.0.0.1:9/quotes", Duration::from_secs(2), 10, "Remote")
                .unwrap();
        assert!(source.fetch_snapshot().await.is_err());
    }
}
