// ABOUTME: Blocking HTTP client for the Granola documents and transcript endpoints
// ABOUTME: Handles throttling, auth headers, and fail-fast errors

use crate::util::truncate_str;
use crate::{Error, Result};
use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_API_BASE: &str = "https://api.granola.ai";

const CLIENT_VERSION: &str = "5.354.0";
const PAGE_LIMIT: u32 = 100;

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
    throttle_min: u64,
    throttle_max: u64,
}

impl ApiClient {
    pub fn new(token: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(ApiClient {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            token,
            throttle_min: 100,
            throttle_max: 300,
        })
    }

    pub fn with_throttle(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.throttle_min = min_ms;
        self.throttle_max = max_ms;
        self
    }

    pub fn disable_throttle(mut self) -> Self {
        self.throttle_min = 0;
        self.throttle_max = 0;
        self
    }

    fn throttle(&self) {
        if self.throttle_max > 0 {
            let sleep_ms = rand::thread_rng().gen_range(self.throttle_min..=self.throttle_max);
            std::thread::sleep(Duration::from_millis(sleep_ms));
        }
    }

    fn send(&self, endpoint: &str, body: &Value) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "*/*")
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("Granola/{}", CLIENT_VERSION))
            .header("X-Client-Version", CLIENT_VERSION)
            .json(body)
            .send()?;

        self.throttle();
        Ok(response)
    }

    fn read_json(endpoint: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            let preview = truncate_str(&message, 100);
            return Err(Error::Api {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                message: preview,
            });
        }

        // Get response text for better error messages
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            debug!("Response body (first 500 chars): {}", truncate_str(&body, 500));
            Error::Parse(e)
        })
    }

    /// Fetches the first page of documents, including each document's last
    /// viewed panel. Documents are returned as raw JSON.
    pub fn list_documents(&self) -> Result<Vec<Value>> {
        let endpoint = "/v2/get-documents";
        let body = json!({
            "limit": PAGE_LIMIT,
            "offset": 0,
            "include_last_viewed_panel": true,
        });

        let response = self.send(endpoint, &body)?;
        let mut value = Self::read_json(endpoint, response)?;

        match value.get_mut("docs").map(Value::take) {
            Some(Value::Array(docs)) => Ok(docs),
            Some(_) => Err(Error::DataShape("'docs' is not a list".into())),
            None => {
                debug!("API response: {}", truncate_str(&value.to_string(), 500));
                Err(Error::DataShape("'docs' key not found".into()))
            }
        }
    }

    /// Fetches a document's transcript. A 404 means the document has no
    /// transcript and yields `Ok(None)`.
    pub fn get_transcript(&self, doc_id: &str) -> Result<Option<Value>> {
        let endpoint = "/v1/get-document-transcript";
        let response = self.send(endpoint, &json!({ "document_id": doc_id }))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No transcript found for document {}", doc_id);
            return Ok(None);
        }

        Self::read_json(endpoint, response).map(Some)
    }
}
