use signlens_capture::CaptureError;
use signlens_classifier::ClassifierError;
use signlens_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("session is not running")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, SessionError>;
