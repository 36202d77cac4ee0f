use std::fmt;

use sdk::SdkError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from the HTTP transport layer.
#[derive(Debug)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    Client(String),

    /// The request never produced a response (connect failure, timeout).
    Request { url: String, reason: String },

    /// The server answered with a non-success HTTP status.
    Status { url: String, status: u16, body: String },

    /// The tracker envelope carried a non-zero code.
    Rejected { url: String, code: i64, message: String },

    /// The response body could not be decoded.
    Decode { url: String, reason: String },

    /// The response decoded but carried an invalid value.
    InvalidResponse(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(reason) => write!(f, "http client setup failed: {reason}"),
            Self::Request { url, reason } => write!(f, "request to '{url}' failed: {reason}"),
            Self::Status { url, status, body } => {
                write!(f, "'{url}' returned HTTP {status}: {body}")
            }
            Self::Rejected { url, code, message } => {
                write!(f, "'{url}' rejected the call ({code}): {message}")
            }
            Self::Decode { url, reason } => {
                write!(f, "invalid response body from '{url}': {reason}")
            }
            Self::InvalidResponse(reason) => write!(f, "invalid response: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// SDK error for a failed chain call.
    pub fn for_chain(&self) -> SdkError {
        SdkError::TransportFailed
    }

    /// SDK error for a failed builder call.
    ///
    /// An unreachable sidecar is a transport failure; anything it answered
    /// with is a build failure.
    pub fn for_builder(&self) -> SdkError {
        match self {
            Self::Client(_) | Self::Request { .. } => SdkError::TransportFailed,
            _ => SdkError::BuildFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_mapping_separates_reachability() {
        let unreachable = TransportError::Request {
            url: "http://builder/mint".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(unreachable.for_builder(), SdkError::TransportFailed);

        let refused = TransportError::Status {
            url: "http://builder/mint".into(),
            status: 422,
            body: "minter already spent".into(),
        };
        assert_eq!(refused.for_builder(), SdkError::BuildFailed);
        assert_eq!(refused.for_chain(), SdkError::TransportFailed);
    }

    #[test]
    fn display_includes_detail() {
        let err = TransportError::Rejected {
            url: "http://tracker/api/minters/x/utxoCount".into(),
            code: 100,
            message: "token not found".into(),
        };
        let text = err.to_string();
        assert!(text.contains("(100)"));
        assert!(text.contains("token not found"));
    }
}
