//! Meting API client
//!
//! Meting is the metadata proxy that the embedded player pulls playlists
//! from. It is also the last resort for locating a track's artwork.

use anyhow::{Result, anyhow};
use reqwest::{Client, header};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::WidgetError;

const TIMEOUT: u64 = 15;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Picture fields in priority order
const PIC_FIELDS: [&str; 3] = ["pic", "picUrl", "cover"];

/// Expand a Meting URL template such as
/// `https://api.example.com/meting/?server=:server&type=:type&id=:id&r=:r`.
///
/// Returns `None` when no template is configured.
pub fn build_meting_url(template: &str, server: &str, kind: &str, id: &str) -> Option<String> {
    build_meting_url_at(
        template,
        server,
        kind,
        id,
        chrono::Utc::now().timestamp_millis(),
    )
}

fn build_meting_url_at(
    template: &str,
    server: &str,
    kind: &str,
    id: &str,
    now_ms: i64,
) -> Option<String> {
    if template.trim().is_empty() {
        return None;
    }
    Some(
        template
            .replacen(":server", server, 1)
            .replacen(":type", kind, 1)
            .replacen(":id", &urlencoding::encode(id), 1)
            .replacen(":auth", "", 1)
            .replacen(":r", &now_ms.to_string(), 1),
    )
}

/// Extract the artwork URL from a Meting `song` response.
///
/// Accepts an array (first element wins) or a single object. An object
/// carrying a numeric `code` other than 200 is an error envelope.
pub fn to_song_pic(json: &str) -> Result<Option<String>, WidgetError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| WidgetError::MalformedInput(e.to_string()))?;

    let item = match &value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        Value::Object(_) => &value,
        _ => {
            return Err(WidgetError::MalformedInput(
                "unexpected response shape".to_string(),
            ));
        }
    };

    if let Some(code) = item.get("code").and_then(Value::as_i64) {
        if code != 200 {
            return Err(WidgetError::Network(format!("api returned code {}", code)));
        }
    }

    Ok(PIC_FIELDS
        .iter()
        .filter_map(|field| item.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|pic| !pic.is_empty())
        .map(str::to_string))
}

/// Thin HTTP client for Meting lookups and image redirects
#[derive(Clone)]
pub struct MetingClient {
    client: Client,
}

impl fmt::Debug for MetingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetingClient")
            .field("client", &"<HttpClient>")
            .finish()
    }
}

impl Default for MetingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MetingClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT))
            .build()
            .unwrap_or_default();
        Self::from_client(client)
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Load an image URL and report where the redirect chain ended
    pub async fn resolve_image(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "image/*")
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("image load failed: {}", response.status()));
        }

        let final_url = response.url().to_string();
        debug!("Image {} resolved to {}", url, final_url);
        Ok(final_url)
    }

    /// Fetch song metadata and pull out the artwork URL
    pub async fn song_pic(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("metadata lookup failed: {}", response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;
        Ok(to_song_pic(&body)?)
    }
}
