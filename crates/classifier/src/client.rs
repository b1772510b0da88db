use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signlens_landmarks::FEATURE_LEN;

use crate::config::ClassifierConfig;
use crate::{Classifier, ClassifierError, Result};

/// One classifier answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Parsed `GET /health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    pub model_loaded: bool,
    pub label_encoder_loaded: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.model_loaded && self.label_encoder_loaded
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    features: &'a [f32],
}

#[derive(Deserialize)]
struct PredictResponse {
    prediction: String,
    // The server sends `null` when the model has no probability output.
    #[serde(default)]
    confidence: Option<f32>,
}

impl PredictResponse {
    fn into_prediction(self) -> Option<Prediction> {
        let label = self.prediction.trim();
        if label.is_empty() {
            return None;
        }
        let confidence = self
            .confidence
            .filter(|c| c.is_finite() && (0.0..=1.0).contains(c));
        if confidence.is_none() && self.confidence.is_some() {
            tracing::debug!(raw = ?self.confidence, "discarding out-of-range confidence");
        }
        Some(Prediction {
            label: label.to_string(),
            confidence,
        })
    }
}

/// HTTP client for the classifier service. Holds no per-request state.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    config: ClassifierConfig,
}

impl PredictionClient {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("signlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClassifierError::ClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    async fn fetch_health(&self) -> std::result::Result<HealthStatus, String> {
        let resp = self
            .http
            .get(self.config.endpoint("health"))
            .timeout(self.config.health_timeout)
            .send()
            .await
            .map_err(describe)?;

        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }

        resp.json::<HealthStatus>().await.map_err(describe)
    }

    async fn fetch_prediction(&self, features: &[f32]) -> std::result::Result<Prediction, String> {
        let resp = self
            .http
            .post(self.config.endpoint("predict"))
            .timeout(self.config.predict_timeout)
            .json(&PredictRequest { features })
            .send()
            .await
            .map_err(describe)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("status {status}: {}", body.trim()));
        }

        resp.json::<PredictResponse>()
            .await
            .map_err(describe)?
            .into_prediction()
            .ok_or_else(|| "empty prediction label".to_string())
    }
}

fn describe(e: reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    }
}

#[async_trait]
impl Classifier for PredictionClient {
    async fn health(&self) -> Option<HealthStatus> {
        match self.fetch_health().await {
            Ok(status) => {
                tracing::debug!(
                    status = %status.status,
                    model_loaded = status.model_loaded,
                    label_encoder_loaded = status.label_encoder_loaded,
                    "classifier health"
                );
                Some(status)
            }
            Err(e) => {
                tracing::warn!(error = %e, "classifier health check failed");
                None
            }
        }
    }

    async fn predict(&self, features: &[f32]) -> Result<Option<Prediction>> {
        if features.len() != FEATURE_LEN {
            return Err(ClassifierError::InvalidFeatureLength {
                expected: FEATURE_LEN,
                actual: features.len(),
            });
        }

        match self.fetch_prediction(features).await {
            Ok(prediction) => Ok(Some(prediction)),
            Err(e) => {
                tracing::warn!(error = %e, "prediction request failed");
                Ok(None)
            }
        }
    }
}
