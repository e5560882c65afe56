use core::{future::Future, time::Duration};

use crate::id::Block;

/// What the block allocation service answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Retry-After` header, if the service sent one.
    pub retry_after: Option<String>,
    /// Response body. On success, a single JSON integer.
    pub body: String,
}

impl Response {
    /// A `200 OK` carrying `block` as its body.
    pub fn ok(block: u64) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: block.to_string(),
        }
    }

    /// A bodyless response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }

    /// Attaches a raw `Retry-After` header value.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: impl Into<String>) -> Self {
        self.retry_after = Some(retry_after.into());
        self
    }
}

/// The request never produced a response (connection refused, timeout, ...).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Wraps a human-readable failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// How requests reach the block allocation service.
///
/// An implementation issues `GET <url>?blocks=<blocks>` (or its equivalent)
/// and reports whatever status the service answered with. Classifying the
/// status is left to the caller.
pub trait Transport: Send + Sync + 'static {
    /// Requests `blocks` more blocks from the service at `url`.
    fn request_blocks(
        &self,
        url: &str,
        blocks: usize,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

/// Why a replenishment attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ServiceError {
    /// 500, 502, 503 or 504: worth retrying.
    #[error("service temporarily unavailable (status {status})")]
    Transient {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// Any other non-success status.
    #[error("service refused the request (status {status})")]
    Terminal { status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A success status whose body is not a usable block.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}

impl ServiceError {
    pub(crate) const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub(crate) const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Turns a raw response into the granted block or a classified failure.
pub(crate) fn classify(response: Response) -> Result<Block, ServiceError> {
    match response.status {
        200..=299 => {
            let value: u64 = serde_json::from_str(response.body.trim()).map_err(|e| {
                ServiceError::MalformedResponse {
                    reason: format!("expected a JSON integer: {e}"),
                }
            })?;
            Block::from_raw(value).map_err(|e| ServiceError::MalformedResponse {
                reason: e.to_string(),
            })
        }
        500 | 502 | 503 | 504 => Err(ServiceError::Transient {
            status: response.status,
            retry_after: response
                .retry_after
                .as_deref()
                .and_then(|secs| secs.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }),
        status => Err(ServiceError::Terminal { status }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_parses_a_json_integer() {
        assert_eq!(classify(Response::ok(1000)), Ok(Block::from_raw(1000).unwrap()));
        let created = Response {
            status: 201,
            retry_after: None,
            body: " 4096\n".into(),
        };
        assert_eq!(classify(created), Ok(Block::from_raw(4096).unwrap()));
    }

    #[test]
    fn success_with_unusable_body_is_malformed() {
        for body in ["", "\"rs\"", "-4", "1.5", "[1000]", "9007199254740991"] {
            let response = Response {
                status: 200,
                retry_after: None,
                body: body.into(),
            };
            let err = classify(response).unwrap_err();
            assert!(matches!(err, ServiceError::MalformedResponse { .. }), "{body}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [500, 502, 503, 504] {
            let err = classify(Response::status(status)).unwrap_err();
            assert!(err.is_retryable(), "{status}");
            assert_eq!(err.retry_after(), None);
        }
    }

    #[test]
    fn retry_after_is_read_as_seconds() {
        let err = classify(Response::status(503).with_retry_after("10")).unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(10)));

        let err = classify(Response::status(503).with_retry_after("soon")).unwrap_err();
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn other_statuses_are_terminal() {
        for status in [301, 400, 404, 429, 501, 505] {
            let err = classify(Response::status(status)).unwrap_err();
            assert_eq!(err, ServiceError::Terminal { status });
            assert!(!err.is_retryable());
        }
    }
}
