use serde::{Deserialize, Serialize};
use signlens_classifier::ClassifierConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    AUTO_SAVE_PERIOD, CONNECTIVITY_REFRESH_PERIOD, DATABASE_FILE_NAME, DATA_DIR_NAME,
    DEFAULT_SERVER_URL, SERVER_URL_ENV,
};
use crate::{Result, SessionError};

/// User-facing settings, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignlensConfig {
    pub server_url: String,
    pub health_timeout_ms: u64,
    pub predict_timeout_ms: u64,
    pub autosave_period_ms: u64,
    pub connectivity_period_ms: u64,
    /// Mirror the overlay horizontally when using a front-facing camera.
    pub mirror_front_camera: bool,
    /// History database location. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for SignlensConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            health_timeout_ms: 3_000,
            predict_timeout_ms: 5_000,
            autosave_period_ms: AUTO_SAVE_PERIOD.as_millis() as u64,
            connectivity_period_ms: CONNECTIVITY_REFRESH_PERIOD.as_millis() as u64,
            mirror_front_camera: true,
            database_path: None,
        }
    }
}

impl SignlensConfig {
    /// Read settings from `path`. A missing file yields defaults; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                tracing::info!(server_url = url, "server url overridden from environment");
                self.server_url = url.to_string();
            }
        }
        self
    }

    pub fn classifier_config(&self) -> Result<ClassifierConfig> {
        let config = ClassifierConfig::new(&self.server_url)?.with_timeouts(
            Duration::from_millis(self.health_timeout_ms),
            Duration::from_millis(self.predict_timeout_ms),
        );
        Ok(config)
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        if self.autosave_period_ms == 0 || self.connectivity_period_ms == 0 {
            return Err(SessionError::Config(
                "timer periods must be greater than zero".to_string(),
            ));
        }
        Ok(SessionConfig {
            autosave_period: Duration::from_millis(self.autosave_period_ms),
            connectivity_period: Duration::from_millis(self.connectivity_period_ms),
            mirror_front_camera: self.mirror_front_camera,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// `<data dir>/signlens/signlens.db`, or the working directory if the
/// platform has no data dir.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATABASE_FILE_NAME)
}

/// Runtime knobs for [`crate::SessionController`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub autosave_period: Duration,
    pub connectivity_period: Duration,
    pub mirror_front_camera: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_period: AUTO_SAVE_PERIOD,
            connectivity_period: CONNECTIVITY_REFRESH_PERIOD,
            mirror_front_camera: true,
        }
    }
}
