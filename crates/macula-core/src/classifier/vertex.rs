//! Hosted endpoint client (Vertex AI `:predict`).
//!
//! Sends the Base64 image in a single request and adapts the reply. There is
//! no retry: any failure becomes one `MaculaError::Classification`.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::adapter::adapt_response;
use super::{Classifier, Prediction};
use crate::config::ClassifierConfig;
use crate::credentials::token::TokenProvider;
use crate::error::{MaculaError, MaculaResult};
use crate::intake::model::ImagePayload;

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictInstance<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    confidence_threshold: f64,
    max_predictions: u32,
}

/// Client for an image-classification endpoint.
pub struct VertexClassifier {
    predict_url: String,
    confidence_threshold: f64,
    max_predictions: u32,
    tokens: Arc<TokenProvider>,
    client: reqwest::Client,
}

impl VertexClassifier {
    /// Build a client. `fallback_project` usually comes from the credentials.
    pub fn new(
        config: &ClassifierConfig,
        fallback_project: Option<&str>,
        tokens: Arc<TokenProvider>,
    ) -> MaculaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MaculaError::startup(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            predict_url: config.predict_url(fallback_project)?,
            confidence_threshold: config.confidence_threshold,
            max_predictions: config.max_predictions,
            tokens,
            client,
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }
}

#[async_trait]
impl Classifier for VertexClassifier {
    async fn classify(&self, image: &ImagePayload) -> MaculaResult<Prediction> {
        let token = self.tokens.access_token().await?;

        let request = PredictRequest {
            instances: vec![PredictInstance {
                content: image.to_base64(),
                mime_type: image.mime(),
            }],
            parameters: PredictParameters {
                confidence_threshold: self.confidence_threshold,
                max_predictions: self.max_predictions,
            },
        };

        debug!(url = %self.predict_url, size = image.len(), "Calling classification endpoint");
        let response = self
            .client
            .post(&self.predict_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MaculaError::classification("classification endpoint timed out")
                } else {
                    MaculaError::classification(format!("failed to call classification endpoint: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MaculaError::classification(format!(
                "endpoint error (HTTP {}): {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MaculaError::classification(format!("failed to parse endpoint response: {}", e)))?;

        let prediction = adapt_response(&body)?;
        debug!(label = %prediction.label, confidence = prediction.confidence, "Prediction received");
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "vertex"
    }
}
