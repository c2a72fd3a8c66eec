//! Classification delegate.
//!
//! The model lives behind a hosted endpoint. This module only shapes the
//! outbound call and folds the endpoint's reply into one `Prediction`.

pub mod adapter;
pub mod vertex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MaculaResult;
use crate::intake::model::ImagePayload;

/// Canonical classification result. `confidence` is a fraction in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl Prediction {
    /// Confidence as a rounded integer percentage.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Something that can label an image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImagePayload) -> MaculaResult<Prediction>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
