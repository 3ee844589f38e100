//! Clarifai Client
//!
//! Scores an image with a hosted Clarifai model and returns its concepts.
//!
//! # API Reference
//! - Endpoint: `POST {base}/v2/users/{user_id}/apps/{app_id}/models/{model_id}/outputs`
//! - Auth header: `Authorization: Key {api_key}`
//! - Body: `{"inputs":[{"data":{"image":{"base64":"..."}}}]}`
//! - Success: `status.code == 10000`, concepts at `outputs[0].data.concepts`
//!   as `{name, value}` pairs
//!
//! A client without an API key still constructs; every call then fails with
//! `BackendError::NotAvailable`; with partial results allowed, a secondary
//! backend can carry the request.

use crate::config::ClarifaiConfig;
use crate::error::BackendError;
use crate::types::{Concept, VisionBackend};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Clarifai status code for a successful request
const STATUS_SUCCESS: u32 = 10000;

/// Backend name used in logs and result sources
pub const CLARIFAI_BACKEND_NAME: &str = "clarifai";

pub struct ClarifaiClient {
    http_client: Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl ClarifaiClient {
    /// Create client for the configured model
    ///
    /// `timeout` bounds each HTTP request; exceeding it is reported as
    /// `BackendError::Timeout`.
    pub fn new(config: &ClarifaiConfig, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/v2/users/{}/apps/{}/models/{}/outputs",
            config.base_url.trim_end_matches('/'),
            config.user_id,
            config.app_id,
            config.model_id
        );

        if config.api_key.is_none() {
            warn!("Clarifai backend configured without an API key; calls will be rejected");
        }

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_image(&self, image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::NotAvailable("Clarifai API key not configured".to_string())
        })?;

        debug!(endpoint = %self.endpoint, image_bytes = image.len(), "Querying Clarifai");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Key {}", api_key))
            .json(&request_body(image))
            .send()
            .await
            .map_err(|e| self.request_error(e, "Clarifai request failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(e, "Failed to read Clarifai response"))?;

        if !status.is_success() {
            // Error bodies usually still carry a status description
            let detail = serde_json::from_str::<ClarifaiResponse>(&body)
                .map(|r| r.status.description)
                .unwrap_or(body);
            return Err(BackendError::Api(format!(
                "Clarifai returned HTTP {}: {}",
                status, detail
            )));
        }

        let concepts = parse_response(&body)?;
        debug!(concepts = concepts.len(), "Clarifai response parsed");
        Ok(concepts)
    }

    /// Client-side timeouts surface as `Timeout`, like the pipeline's own
    fn request_error(&self, err: reqwest::Error, context: &str) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout.as_millis() as u64)
        } else {
            BackendError::Network(format!("{}: {}", context, err))
        }
    }
}

#[async_trait]
impl VisionBackend for ClarifaiClient {
    fn name(&self) -> &str {
        CLARIFAI_BACKEND_NAME
    }

    async fn score(&self, image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        self.post_image(image).await
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ClarifaiRequest {
    inputs: Vec<ClarifaiInput>,
}

#[derive(Debug, Serialize)]
struct ClarifaiInput {
    data: ClarifaiInputData,
}

#[derive(Debug, Serialize)]
struct ClarifaiInputData {
    image: ClarifaiImage,
}

#[derive(Debug, Serialize)]
struct ClarifaiImage {
    base64: String,
}

#[derive(Debug, Deserialize)]
struct ClarifaiResponse {
    status: ClarifaiStatus,
    outputs: Option<Vec<ClarifaiOutput>>,
}

#[derive(Debug, Deserialize)]
struct ClarifaiStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ClarifaiOutput {
    data: Option<ClarifaiOutputData>,
}

#[derive(Debug, Deserialize)]
struct ClarifaiOutputData {
    #[serde(default)]
    concepts: Vec<ClarifaiConcept>,
}

#[derive(Debug, Deserialize)]
struct ClarifaiConcept {
    name: String,
    value: f32,
}

fn request_body(image: &[u8]) -> ClarifaiRequest {
    ClarifaiRequest {
        inputs: vec![ClarifaiInput {
            data: ClarifaiInputData {
                image: ClarifaiImage {
                    base64: STANDARD.encode(image),
                },
            },
        }],
    }
}

/// Extract concepts from a Clarifai response body
fn parse_response(body: &str) -> Result<Vec<Concept>, BackendError> {
    let response: ClarifaiResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::Parse(format!("Failed to parse Clarifai response: {}", e)))?;

    if response.status.code != STATUS_SUCCESS {
        return Err(BackendError::Api(format!(
            "Clarifai status {}: {}",
            response.status.code, response.status.description
        )));
    }

    let output = response
        .outputs
        .and_then(|outputs| outputs.into_iter().next())
        .ok_or_else(|| BackendError::Parse("Clarifai response has no outputs".to_string()))?;

    Ok(output
        .data
        .map(|data| data.concepts)
        .unwrap_or_default()
        .into_iter()
        .map(|c| Concept::new(c.name, c.value))
        .collect())
}
