use std::time::Duration;

use mockup_contracts::StateError;
use uuid::Uuid;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No usable credential; never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{}", remote_message(*status, message))]
    Remote { status: Option<u16>, message: String },

    #[error("request timed out after {}s", after.as_secs())]
    Timeout { after: Duration },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<EngineError>,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// `last_error` is the last slot failure, absent when every slot came back empty.
    #[error("no images returned ({requested} requested)")]
    NoImages {
        requested: usize,
        #[source]
        last_error: Option<Box<EngineError>>,
    },

    #[error("every job in the batch failed ({jobs} jobs)")]
    BatchEmpty { jobs: usize },

    #[error("upscale of {result_id} failed: {source}")]
    Upscale {
        result_id: Uuid,
        source: Box<EngineError>,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

impl EngineError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        EngineError::Remote {
            status,
            message: message.into(),
        }
    }

    /// Overload and rate limiting are worth retrying; everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Remote { status, message } => {
                if matches!(status, Some(429 | 503)) {
                    return true;
                }
                let lowered = message.to_ascii_lowercase();
                ["unavailable", "overloaded", "rate limit", "resource_exhausted"]
                    .iter()
                    .any(|marker| lowered.contains(marker))
            }
            EngineError::Timeout { .. } => true,
            _ => false,
        }
    }
}

fn remote_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("remote call failed ({code}): {message}"),
        None => format!("remote call failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes_and_messages() {
        assert!(EngineError::remote(Some(503), "busy").is_transient());
        assert!(EngineError::remote(Some(429), "slow down").is_transient());
        assert!(EngineError::remote(None, "Service Unavailable").is_transient());
        assert!(EngineError::remote(Some(400), "RESOURCE_EXHAUSTED: quota").is_transient());
        assert!(EngineError::Timeout {
            after: Duration::from_secs(90)
        }
        .is_transient());

        assert!(!EngineError::remote(Some(400), "bad request").is_transient());
        assert!(!EngineError::remote(Some(500), "internal").is_transient());
        assert!(!EngineError::Configuration("no key".to_string()).is_transient());
        assert!(!EngineError::MalformedResponse("not json".to_string()).is_transient());
    }

    #[test]
    fn exhausted_is_not_retried_again() {
        let err = EngineError::Exhausted {
            attempts: 3,
            last: Box::new(EngineError::remote(Some(503), "busy")),
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "gave up after 3 attempts: remote call failed (503): busy"
        );
    }
}
