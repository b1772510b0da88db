use std::time::Duration;

/// How often the current prediction is considered for the history.
pub const AUTO_SAVE_PERIOD: Duration = Duration::from_secs(3);

/// How often the classifier health endpoint is polled while running.
pub const CONNECTIVITY_REFRESH_PERIOD: Duration = Duration::from_secs(10);

/// Log once per this many frames dropped at the admission gate.
pub const DROP_LOG_EVERY: u64 = 30;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Directory under the platform data dir holding the database.
pub const DATA_DIR_NAME: &str = "signlens";

pub const DATABASE_FILE_NAME: &str = "signlens.db";

/// Overrides `server_url` from the config file.
pub const SERVER_URL_ENV: &str = "SIGNLENS_SERVER_URL";
