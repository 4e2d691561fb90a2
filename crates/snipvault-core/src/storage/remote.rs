//! Remote storage adapter
//!
//! REST client implementing the uniform contract against an external
//! storage service. Every operation validates the configured base URL
//! before issuing a request and fails fast otherwise; any non-2xx
//! response surfaces as an error carrying the HTTP status text. There
//! are no retries; each call is an independent request with a bounded
//! timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mapper::{
    NamespaceJson, SnippetJson, namespace_from_json, namespace_to_json, snippet_from_json,
    snippet_to_json,
};
use crate::model::{Namespace, Snippet};
use crate::storage::SnippetStore;

/// Timeout for the connectivity probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for CRUD requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client to the external storage service
#[derive(Debug, Clone)]
pub struct RemoteStore {
    http: HttpClient,
    base_url: Url,
}

impl RemoteStore {
    /// Create an adapter for the given base URL
    ///
    /// Fails with a configuration error when the URL is empty,
    /// unparseable, or not http(s), before any network traffic.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("could not build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Probe the service's `/health` endpoint
    ///
    /// Returns `false` on any failure, never errors. Bounded by a 5 s
    /// timeout independent of the CRUD timeout.
    pub async fn test_connection(&self) -> bool {
        let url = self.endpoint("health");
        match self.http.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }

    /// Probe an arbitrary URL; a malformed URL is `false` without a network call
    pub async fn probe(base_url: &str) -> bool {
        match Self::new(base_url) {
            Ok(store) => store.test_connection().await,
            Err(_) => false,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(send_error)?;
        read_json(ensure_success(resp)?).await
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let resp = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(send_error)?;
        ensure_success(resp)?;
        Ok(())
    }
}

fn validate_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("remote storage URL is empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("invalid remote storage URL '{trimmed}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "remote storage URL '{trimmed}' must use http or https"
        )));
    }
    Ok(url)
}

/// A request that could not be sent is a network-level failure
fn send_error(e: reqwest::Error) -> Error {
    Error::Connectivity(e.to_string())
}

/// Map a non-2xx response to an error carrying the status text
fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(Error::RemoteRequest(format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp.text().await.map_err(send_error)?;
    Ok(serde_json::from_str(&body)?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkMoveRequest<'a> {
    snippet_ids: &'a [String],
    target_namespace_id: &'a str,
}

#[async_trait]
impl SnippetStore for RemoteStore {
    async fn list_snippets(&self) -> Result<Vec<Snippet>> {
        let records: Vec<SnippetJson> = self.get_json("api/snippets").await?;
        records.into_iter().map(snippet_from_json).collect()
    }

    async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>> {
        let resp = self
            .http
            .get(self.endpoint(&format!("api/snippets/{id}")))
            .send()
            .await
            .map_err(send_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record: SnippetJson = read_json(ensure_success(resp)?).await?;
        snippet_from_json(record).map(Some)
    }

    async fn create_snippet(&self, snippet: &Snippet) -> Result<()> {
        let record = snippet_to_json(snippet)?;
        self.post_json("api/snippets", &record).await?;
        debug!(id = %snippet.id, "created snippet remotely");
        Ok(())
    }

    async fn update_snippet(&self, snippet: &Snippet) -> Result<()> {
        let record = snippet_to_json(snippet)?;
        let resp = self
            .http
            .put(self.endpoint(&format!("api/snippets/{}", snippet.id)))
            .json(&record)
            .send()
            .await
            .map_err(send_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::SnippetNotFound(snippet.id.clone()));
        }
        ensure_success(resp)?;
        Ok(())
    }

    async fn delete_snippet(&self, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.endpoint(&format!("api/snippets/{id}")))
            .send()
            .await
            .map_err(send_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::SnippetNotFound(id.to_string()));
        }
        ensure_success(resp)?;
        Ok(())
    }

    async fn list_snippets_in_namespace(&self, namespace_id: &str) -> Result<Vec<Snippet>> {
        // The service has no per-namespace query; filter the full listing
        let snippets = self.list_snippets().await?;
        Ok(snippets
            .into_iter()
            .filter(|s| s.namespace_id == namespace_id)
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let records: Vec<NamespaceJson> = self.get_json("api/namespaces").await?;
        records.into_iter().map(namespace_from_json).collect()
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let record = namespace_to_json(namespace)?;
        self.post_json("api/namespaces", &record).await
    }

    async fn remove_namespace(&self, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.endpoint(&format!("api/namespaces/{id}")))
            .send()
            .await
            .map_err(send_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NamespaceNotFound(id.to_string()));
        }
        ensure_success(resp)?;
        Ok(())
    }

    async fn reassign_namespace(&self, from: &str, to: &str) -> Result<u64> {
        // No dedicated endpoint; resolve the member ids and bulk-move them
        let ids: Vec<String> = self
            .list_snippets_in_namespace(from)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let moved = ids.len() as u64;
        self.bulk_move_snippets(&ids, to).await?;
        Ok(moved)
    }

    async fn bulk_move_snippets(&self, ids: &[String], target_namespace_id: &str) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.post_json(
            "api/snippets/bulk-move",
            &BulkMoveRequest {
                snippet_ids: ids,
                target_namespace_id,
            },
        )
        .await
    }

    async fn wipe(&self) -> Result<()> {
        warn!(url = %self.base_url, "wiping remote store");
        let resp = self
            .http
            .post(self.endpoint("api/wipe"))
            .send()
            .await
            .map_err(send_error)?;
        ensure_success(resp)?;
        Ok(())
    }
}
