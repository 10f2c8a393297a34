//! Error taxonomy of the feed pipeline
//!
//! Every error travelling through the pipeline is a [`FeedError`]: a
//! severity chosen where the error is tagged, the operation that failed and
//! the kind of failure.

use crate::domain::Producer;
use feedlink::BrokerError;
use std::fmt;
use thiserror::Error;

/// How much attention an error deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Record and continue
    Log,
    /// Operator attention
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Log => write!(f, "log"),
            Severity::Notice => write!(f, "notice"),
        }
    }
}

/// Malformed input from the broker or from an API response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("bad routing key {key:?}: {reason}")]
    BadRoutingKey { key: String, reason: String },

    #[error("bad urn {0:?}")]
    BadUrn(String),

    #[error("malformed {what}: {message}")]
    Malformed { what: String, message: String },

    #[error("bad template {template:?}: {reason}")]
    BadTemplate { template: String, reason: String },
}

impl DecodeError {
    pub(crate) fn routing(key: &str, reason: impl Into<String>) -> Self {
        DecodeError::BadRoutingKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(what: impl Into<String>, message: impl fmt::Display) -> Self {
        DecodeError::Malformed {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

/// Failed call to the provider's HTTP API
#[derive(Error, Debug)]
#[error("{method} {url} failed{}: {message}", status_suffix(.status))]
pub struct ApiError {
    pub method: &'static str,
    pub url: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Response body, when a response was received
    pub body: String,
    pub message: String,
    #[source]
    pub inner: Option<reqwest::Error>,
}

impl ApiError {
    /// Non-success response
    pub fn status(method: &'static str, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            status: Some(status),
            body: body.into(),
            message: "unexpected response status".to_string(),
            inner: None,
        }
    }

    /// The request never produced a response
    pub fn transport(method: &'static str, url: impl Into<String>, err: reqwest::Error) -> Self {
        Self {
            method,
            url: url.into(),
            status: err.status().map(|s| s.as_u16()),
            body: String::new(),
            message: err.to_string(),
            inner: Some(err),
        }
    }

    /// The response body could not be decoded
    pub fn decode(method: &'static str, url: impl Into<String>, body: impl Into<String>, err: impl fmt::Display) -> Self {
        Self {
            method,
            url: url.into(),
            status: Some(200),
            body: body.into(),
            message: format!("cannot decode response: {}", err),
            inner: None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {}", s)).unwrap_or_default()
}

/// What went wrong
#[derive(Error, Debug)]
pub enum ErrorKind {
    /// Broker dial or read failure
    #[error(transparent)]
    Transport(#[from] BrokerError),

    /// Bad routing key or malformed body
    #[error(transparent)]
    Protocol(#[from] DecodeError),

    /// HTTP API failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Recovery request rejected or failed
    #[error("recovery request {request_id} for {producer} failed: {source}")]
    Recovery {
        producer: Producer,
        request_id: u64,
        #[source]
        source: ApiError,
    },

    /// Invariant violation or failure inside a user callback
    #[error("{0}")]
    Internal(String),
}

/// Error delivered to the pipeline's error listener
#[derive(Error, Debug)]
#[error("{op}: {kind}")]
pub struct FeedError {
    pub severity: Severity,
    /// Operation that produced the error
    pub op: &'static str,
    #[source]
    pub kind: ErrorKind,
}

impl FeedError {
    pub fn new(severity: Severity, op: &'static str, kind: impl Into<ErrorKind>) -> Self {
        Self {
            severity,
            op,
            kind: kind.into(),
        }
    }

    pub fn log(op: &'static str, kind: impl Into<ErrorKind>) -> Self {
        Self::new(Severity::Log, op, kind)
    }

    pub fn notice(op: &'static str, kind: impl Into<ErrorKind>) -> Self {
        Self::new(Severity::Notice, op, kind)
    }

    pub fn internal(op: &'static str, message: impl Into<String>) -> Self {
        Self::notice(op, ErrorKind::Internal(message.into()))
    }

    #[inline]
    pub fn is_notice(&self) -> bool {
        self.severity == Severity::Notice
    }

    /// Errors after which the feed cannot continue
    pub fn is_terminal(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport(e) if e.is_terminal())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_feed_error_display_and_source() {
        let err = FeedError::log(
            "decoder",
            DecodeError::routing("x.y", "expected at least 7 fields"),
        );
        assert_eq!(
            err.to_string(),
            "decoder: bad routing key \"x.y\": expected at least 7 fields"
        );
        assert!(err.source().is_some());
        assert!(!err.is_notice());
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::status("GET", "https://api/v1/x.xml", 404, "<error/>");
        assert_eq!(
            err.to_string(),
            "GET https://api/v1/x.xml failed with status 404: unexpected response status"
        );
        assert_eq!(err.body, "<error/>");
    }

    #[test]
    fn test_terminal_transport_error() {
        let err = FeedError::notice("broker", BrokerError::AccessRefused("403".into()));
        assert!(err.is_terminal());
        assert!(err.is_notice());
    }
}
