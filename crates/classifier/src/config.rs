use reqwest::Url;
use std::time::Duration;

use crate::{ClassifierError, Result};

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the classifier lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    base_url: Url,
    pub health_timeout: Duration,
    pub predict_timeout: Duration,
}

impl ClassifierConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut url =
            Url::parse(base_url).map_err(|e| ClassifierError::InvalidBaseUrl(e.to_string()))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ClassifierError::InvalidBaseUrl(base_url.to_string()));
        }
        // Endpoint paths are joined relative to the base, which needs a trailing slash.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            predict_timeout: DEFAULT_PREDICT_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, health: Duration, predict: Duration) -> Self {
        self.health_timeout = health;
        self.predict_timeout = predict;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Url {
        // `path` is a static relative segment, joining cannot fail.
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_under_base() {
        let config = ClassifierConfig::new("http://10.0.2.2:8000").unwrap();
        assert_eq!(config.endpoint("health").as_str(), "http://10.0.2.2:8000/health");

        let nested = ClassifierConfig::new("https://example.com/api/v1").unwrap();
        assert_eq!(
            nested.endpoint("predict").as_str(),
            "https://example.com/api/v1/predict"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            ClassifierConfig::new("not a url"),
            Err(ClassifierError::InvalidBaseUrl(_))
        ));
        assert!(ClassifierConfig::new("ftp://example.com").is_err());
        assert!(ClassifierConfig::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_default_timeouts() {
        let config = ClassifierConfig::new("http://localhost:8000").unwrap();
        assert_eq!(config.health_timeout, DEFAULT_HEALTH_TIMEOUT);
        assert_eq!(config.predict_timeout, DEFAULT_PREDICT_TIMEOUT);

        let custom = config.with_timeouts(Duration::from_millis(100), Duration::from_millis(200));
        assert_eq!(custom.predict_timeout, Duration::from_millis(200));
    }
}
