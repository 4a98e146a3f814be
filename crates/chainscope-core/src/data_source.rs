//! Provider contract and the error type every adapter speaks.
//!
//! Each upstream service is wrapped by an adapter that exposes its own typed
//! operations (see [`crate::adapters`]) plus the small [`DataSource`] surface
//! the router needs for provider selection and health probing.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::HttpError;
use crate::ProviderId;

/// Boxed future returned by adapter and provider-attempt calls.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Missing credential or endpoint.
    NotConfigured,
    /// Transport failure, non-2xx status or provider-reported error payload.
    Unavailable,
    RateLimited,
    /// Structurally valid response that failed semantic validation.
    InvalidResponse,
    InvalidRequest,
    Timeout,
    CircuitOpen,
    Internal,
}

/// Structured source error used by fallback bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotConfigured,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: format!("timed out after {timeout_ms}ms"),
            retryable: true,
        }
    }

    pub fn circuit_open() -> Self {
        Self {
            kind: SourceErrorKind::CircuitOpen,
            message: String::from("circuit breaker open"),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a transport failure, prefixing the provider for context.
    pub fn from_transport(provider: ProviderId, error: &HttpError) -> Self {
        let message = format!("{provider} transport error: {}", error.message());
        if error.retryable() {
            Self::unavailable(message)
        } else {
            Self::internal(message)
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotConfigured => "source.not_configured",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::CircuitOpen => "source.circuit_open",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SourceError {}

impl From<crate::ValidationError> for SourceError {
    fn from(error: crate::ValidationError) -> Self {
        Self::invalid_response(error.to_string())
    }
}

/// Minimal provider surface used for selection and health probing.
///
/// Implementations must be `Send + Sync`; adapters are shared behind `Arc`
/// across concurrent router calls.
pub trait DataSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Whether the credentials or endpoint this provider needs are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Issues one lightweight call that proves the upstream is reachable.
    ///
    /// Probes bypass response caches so they reflect current reachability.
    fn probe<'a>(&'a self) -> SourceFuture<'a, ()>;
}
