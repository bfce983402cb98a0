use serde::Serialize;

/// Everything that can go wrong while fetching or reading one source.
///
/// Every variant names the source it came from so the failure can be reported
/// to the user without any extra context.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("{source_name}: request failed: {message}")]
    Transport {
        source_name: String,
        message: String,
    },
    #[error("{source_name}: timed out after {seconds}s")]
    Timeout { source_name: String, seconds: u64 },
    #[error("{source_name}: server answered with status {status}")]
    Status { source_name: String, status: u16 },
    #[error("{source_name}: webdriver error: {message}")]
    WebDriver {
        source_name: String,
        message: String,
    },
    #[error("{source_name}: unexpected document structure: {message}")]
    Structure {
        source_name: String,
        message: String,
    },
}

impl ScrapeError {
    pub fn structure(source_name: &str, message: impl Into<String>) -> Self {
        ScrapeError::Structure {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn webdriver(source_name: &str, message: impl Into<String>) -> Self {
        ScrapeError::WebDriver {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// Maps a reqwest failure onto the transport/timeout/status split.
    pub fn from_reqwest(source_name: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout {
                source_name: source_name.to_string(),
                seconds: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            ScrapeError::Status {
                source_name: source_name.to_string(),
                status: status.as_u16(),
            }
        } else {
            ScrapeError::Transport {
                source_name: source_name.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Result of one fetch-and-parse operation.
///
/// "No data" is the normal answer for a non-trading date and is kept apart
/// from a failed fetch, because the two are reported differently.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    Data { value: T },
    NoData { reason: String },
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: ScrapeError,
    },
}

fn serialize_display<S: serde::Serializer>(err: &ScrapeError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

impl<T> SourceOutcome<T> {
    pub fn data(value: T) -> Self {
        SourceOutcome::Data { value }
    }

    pub fn no_data(reason: impl Into<String>) -> Self {
        SourceOutcome::NoData {
            reason: reason.into(),
        }
    }

    pub fn failed(error: ScrapeError) -> Self {
        SourceOutcome::Failed { error }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SourceOutcome::Data { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, SourceOutcome::Data { .. })
    }
}
