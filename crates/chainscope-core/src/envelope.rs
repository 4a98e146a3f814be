use serde::{Deserialize, Serialize};

use crate::fallback::RouteError;
use crate::{CoreError, ProviderId, Routed, UtcDateTime, ValidationError};

/// Standard response envelope for every machine-readable `chainscope` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope for a routed value, carrying its provenance into `meta`.
    pub fn from_routed<U>(
        request_id: impl Into<String>,
        latency_ms: u64,
        routed: Routed<U>,
        to_data: impl FnOnce(U) -> T,
    ) -> Result<Self, ValidationError> {
        let meta = EnvelopeMeta::new(request_id, latency_ms)?
            .with_route(routed.source, routed.fallbacks_used);
        Ok(Self::success(meta, to_data(routed.data)))
    }

    pub fn push_error(&mut self, error: EnvelopeError) {
        self.errors.push(error);
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn to_json(&self, pretty: bool) -> Result<String, CoreError> {
        let payload = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(payload)
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub generated_at: UtcDateTime,
    /// Provider that answered; absent for aggregate operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
    pub fallbacks_used: usize,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(request_id: impl Into<String>, latency_ms: u64) -> Result<Self, ValidationError> {
        let request_id = request_id.into();
        if request_id.trim().len() < 8 {
            return Err(ValidationError::InvalidRequestId);
        }

        Ok(Self {
            request_id,
            generated_at: UtcDateTime::now(),
            source: None,
            fallbacks_used: 0,
            latency_ms,
            warnings: Vec::new(),
        })
    }

    pub fn with_route(mut self, source: ProviderId, fallbacks_used: usize) -> Self {
        self.source = Some(source);
        self.fallbacks_used = fallbacks_used;
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// One entry per failed provider for exhausted routes, else one entry.
    pub fn from_route_error(error: &RouteError) -> Vec<Self> {
        match error.failures() {
            [] => vec![Self::new(error.code(), error.to_string())],
            failures => failures
                .iter()
                .map(|failure| {
                    Self::new(error.code(), failure.reason.clone())
                        .with_source(failure.provider.clone())
                })
                .collect(),
        }
    }
}
