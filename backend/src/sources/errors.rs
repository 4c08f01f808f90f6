use thiserror::Error;

/// Why one source produced no value this cycle. Never escapes the adapter.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("timed out")]
    Timeout,

    #[error("non-success status {0}")]
    Status(u16),

    #[error("no extraction strategy matched ({0})")]
    Parse(String),

    #[error("invalid request header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}
