//! Ordered, single-pass provider fallback.
//!
//! [`FallbackExecutor::execute`] walks a list of [`ProviderAttempt`]s in order,
//! consults the shared [`CircuitBreakerRegistry`] before each one, and returns
//! the first result the validator accepts. A validator rejection counts as a
//! provider failure. Each provider is invoked at most once per call.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::circuit_breaker::{CircuitBreakerRegistry, SlotDecision};
use crate::data_source::{SourceError, SourceFuture};
use crate::ValidationError;

/// Default upper bound on a single provider attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

type Invoke<'a, T> = Box<dyn FnOnce() -> SourceFuture<'a, T> + Send + 'a>;

/// Validator applied to a provider's normalized value. `Err` carries the
/// rejection reason recorded for that provider.
pub type Validator<T> = fn(&T) -> Result<(), String>;

/// One named provider call, built fresh for every routed operation.
pub struct ProviderAttempt<'a, T> {
    name: String,
    invoke: Invoke<'a, T>,
}

impl<'a, T> ProviderAttempt<'a, T> {
    pub fn new<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: FnOnce() -> SourceFuture<'a, T> + Send + 'a,
    {
        Self {
            name: name.into(),
            invoke: Box::new(invoke),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for ProviderAttempt<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAttempt")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Successful fallback result.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackOutcome<T> {
    pub value: T,
    pub source_name: String,
    /// Zero-based position of the provider that answered.
    pub fallback_index: usize,
}

/// One provider's recorded failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub provider: String,
    pub reason: String,
}

impl Display for AttemptFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Failure of a routed operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No provider for this operation has the credentials or endpoint it needs.
    #[error("{message}")]
    NotConfigured { message: String },

    #[error("no providers supplied for this operation")]
    NoProviders,

    /// Every provider failed, was rejected, or was skipped by its breaker.
    #[error("{}", join_failures(.failures))]
    Exhausted { failures: Vec<AttemptFailure> },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl RouteError {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "route.not_configured",
            Self::NoProviders => "route.no_providers",
            Self::Exhausted { .. } => "route.exhausted",
            Self::Invalid(_) => "route.invalid_input",
        }
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::Exhausted { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs provider attempts in order against a shared breaker registry.
#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    breakers: Arc<CircuitBreakerRegistry>,
    attempt_timeout: Duration,
}

impl FallbackExecutor {
    pub fn new(breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            breakers,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub const fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub async fn execute<'a, T>(
        &self,
        attempts: Vec<ProviderAttempt<'a, T>>,
        validate: Option<Validator<T>>,
    ) -> Result<FallbackOutcome<T>, RouteError> {
        if attempts.is_empty() {
            return Err(RouteError::NoProviders);
        }

        let mut failures = Vec::with_capacity(attempts.len());

        for (index, attempt) in attempts.into_iter().enumerate() {
            let ProviderAttempt { name, invoke } = attempt;

            if self.breakers.attempt_slot(&name) == SlotDecision::Denied {
                tracing::debug!(provider = %name, index, "skipping provider with open circuit");
                failures.push(AttemptFailure {
                    provider: name,
                    reason: SourceError::circuit_open().to_string(),
                });
                continue;
            }

            tracing::debug!(provider = %name, index, "attempting provider");
            let started = Instant::now();
            let result = match tokio::time::timeout(self.attempt_timeout, invoke()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::timeout(duration_ms(self.attempt_timeout))),
            };

            let checked = result.and_then(|value| match validate {
                Some(validate) => validate(&value)
                    .map(|()| value)
                    .map_err(SourceError::invalid_response),
                None => Ok(value),
            });

            match checked {
                Ok(value) => {
                    self.breakers.record_success(&name);
                    if index > 0 {
                        tracing::info!(
                            provider = %name,
                            index,
                            failed = failures.len(),
                            "fallback provider succeeded"
                        );
                    }
                    return Ok(FallbackOutcome {
                        value,
                        source_name: name,
                        fallback_index: index,
                    });
                }
                Err(error) => {
                    self.breakers.record_failure(&name);
                    tracing::warn!(
                        provider = %name,
                        index,
                        code = error.code(),
                        elapsed_ms = duration_ms(started.elapsed()),
                        reason = %error,
                        "provider attempt failed"
                    );
                    failures.push(AttemptFailure {
                        provider: name,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Err(RouteError::Exhausted { failures })
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}
