//! Client for the remote sign classifier.
//!
//! The server exposes two endpoints:
//! - `GET /health` reporting whether the model and label encoder are loaded
//! - `POST /predict` taking 63 landmark features and returning a label
//!
//! Prediction is advisory. Transport failures, timeouts and bad responses are
//! logged and surface as `None`; only caller mistakes (wrong feature count)
//! are returned as errors.

mod client;
mod config;

pub use client::{HealthStatus, Prediction, PredictionClient};
pub use config::{ClassifierConfig, DEFAULT_HEALTH_TIMEOUT, DEFAULT_PREDICT_TIMEOUT};

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    InvalidFeatureLength { expected: usize, actual: usize },
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Classifier seam used by the session layer.
///
/// Implemented by [`PredictionClient`]; tests substitute in-process fakes.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Full health response, or `None` if the server could not be reached or
    /// answered with something unparseable.
    async fn health(&self) -> Option<HealthStatus>;

    /// True only when the server reports both model and label encoder loaded.
    async fn health_check(&self) -> bool {
        self.health().await.is_some_and(|h| h.is_ready())
    }

    /// Classify one feature vector.
    ///
    /// Returns `Err` only for a feature count other than 63, before any
    /// request is made. Every other failure is `Ok(None)`.
    async fn predict(&self, features: &[f32]) -> Result<Option<Prediction>>;
}
