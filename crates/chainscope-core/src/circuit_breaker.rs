//! Per-provider circuit breakers.
//!
//! One [`CircuitBreakerRegistry`] is owned by each router. Entries are created
//! lazily on first reference and keyed by provider name, so a provider's state
//! is shared by every operation that routes through it.
//!
//! ```text
//!   Closed ──(threshold consecutive failures)──▶ Open
//!   Open ──(recovery window elapsed, one probe)──▶ HalfOpen
//!   HalfOpen ──success──▶ Closed
//!   HalfOpen ──failure──▶ Open (timer restarts)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Runtime circuit state for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    /// Recovery window elapsed and the single probe attempt is in flight.
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time after the last failure before one probe is let through.
    pub recovery_time: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_time: Duration::from_secs(60),
        }
    }
}

/// Outcome of asking whether a provider may be called right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// Circuit closed; call normally.
    Allowed,
    /// Recovery window elapsed; this call is the single half-open probe.
    Probe,
    /// Circuit open (or a probe is already in flight); skip the provider.
    Denied,
}

/// Read-only view of one provider's breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub is_open: bool,
    pub failures: u32,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// When the current half-open slot was handed out.
    half_open_since: Option<Instant>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure: None,
            half_open_since: None,
        }
    }
}

impl CircuitInner {
    fn recovery_elapsed(&self, recovery_time: Duration) -> bool {
        self.last_failure
            .map(|at| at.elapsed() > recovery_time)
            .unwrap_or(true)
    }

    /// A half-open slot whose caller never reported back expires after one
    /// recovery window.
    fn half_open_abandoned(&self, recovery_time: Duration) -> bool {
        self.half_open_since
            .map(|at| at.elapsed() > recovery_time)
            .unwrap_or(true)
    }

    fn would_deny(&self, recovery_time: Duration) -> bool {
        match self.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => !self.half_open_abandoned(recovery_time),
            CircuitState::Open => !self.recovery_elapsed(recovery_time),
        }
    }
}

/// Thread-safe table of per-provider circuit breakers.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    circuits: Mutex<HashMap<String, CircuitInner>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Decides whether `provider` may be called, consuming the half-open
    /// probe slot when the recovery window has just elapsed.
    pub fn attempt_slot(&self, provider: &str) -> SlotDecision {
        let mut circuits = self.lock();
        let inner = circuits.entry(provider.to_owned()).or_default();

        match inner.state {
            CircuitState::Closed => SlotDecision::Allowed,
            CircuitState::HalfOpen => {
                if inner.half_open_abandoned(self.config.recovery_time) {
                    inner.half_open_since = Some(Instant::now());
                    tracing::debug!(provider, "half-open attempt never reported; allowing another");
                    SlotDecision::Probe
                } else {
                    SlotDecision::Denied
                }
            }
            CircuitState::Open => {
                if inner.recovery_elapsed(self.config.recovery_time) {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_since = Some(Instant::now());
                    tracing::debug!(provider, "circuit half-open; allowing one probe");
                    SlotDecision::Probe
                } else {
                    SlotDecision::Denied
                }
            }
        }
    }

    /// Side-effect-free check: true when the next [`attempt_slot`] would deny.
    ///
    /// [`attempt_slot`]: CircuitBreakerRegistry::attempt_slot
    pub fn is_open(&self, provider: &str) -> bool {
        self.lock()
            .get(provider)
            .map(|inner| inner.would_deny(self.config.recovery_time))
            .unwrap_or(false)
    }

    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.lock();
        let inner = circuits.entry(provider.to_owned()).or_default();
        if inner.state != CircuitState::Closed {
            tracing::info!(provider, "circuit closed after successful call");
        }

        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_since = None;
    }

    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.lock();
        let inner = circuits.entry(provider.to_owned()).or_default();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let reopen = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if reopen {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    provider,
                    failures = inner.consecutive_failures,
                    recovery_ms = self.config.recovery_time.as_millis() as u64,
                    "circuit opened"
                );
            }
            inner.state = CircuitState::Open;
            inner.last_failure = Some(Instant::now());
            inner.half_open_since = None;
        }
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.lock()
            .get(provider)
            .map(|inner| inner.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.lock()
            .get(provider)
            .map(|inner| inner.consecutive_failures)
            .unwrap_or(0)
    }

    /// Diagnostic view of every provider referenced so far.
    pub fn snapshot(&self) -> BTreeMap<String, CircuitSnapshot> {
        let recovery_time = self.config.recovery_time;
        self.lock()
            .iter()
            .map(|(name, inner)| {
                (
                    name.clone(),
                    CircuitSnapshot {
                        state: inner.state,
                        is_open: inner.would_deny(recovery_time),
                        failures: inner.consecutive_failures,
                    },
                )
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CircuitInner>> {
        self.circuits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(CircuitBreakerConfig::default())
    }

    #[test]
    fn unknown_providers_start_closed() {
        let breakers = registry();

        assert!(!breakers.is_open("defillama"));
        assert_eq!(breakers.state("defillama"), CircuitState::Closed);
        assert_eq!(breakers.attempt_slot("defillama"), SlotDecision::Allowed);
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breakers = registry();

        breakers.record_failure("coingecko");
        breakers.record_failure("coingecko");
        assert_eq!(breakers.state("coingecko"), CircuitState::Closed);
        assert!(!breakers.is_open("coingecko"));

        breakers.record_failure("coingecko");
        assert_eq!(breakers.state("coingecko"), CircuitState::Open);
        assert!(breakers.is_open("coingecko"));
        assert_eq!(breakers.attempt_slot("coingecko"), SlotDecision::Denied);
    }

    #[test]
    fn success_resets_failure_count() {
        let breakers = registry();

        breakers.record_failure("etherscan");
        breakers.record_failure("etherscan");
        breakers.record_success("etherscan");
        assert_eq!(breakers.consecutive_failures("etherscan"), 0);

        breakers.record_failure("etherscan");
        breakers.record_failure("etherscan");
        assert_eq!(breakers.state("etherscan"), CircuitState::Closed);
    }

    #[test]
    fn breakers_are_isolated_per_provider() {
        let breakers = registry();
        for _ in 0..3 {
            breakers.record_failure("blobscan");
        }

        assert!(breakers.is_open("blobscan"));
        assert!(!breakers.is_open("growthepie"));
    }

    #[tokio::test(start_paused = true)]
    async fn allows_exactly_one_probe_after_recovery() {
        let breakers = registry();
        for _ in 0..3 {
            breakers.record_failure("rpc");
        }

        for _ in 0..5 {
            assert_eq!(breakers.attempt_slot("rpc"), SlotDecision::Denied);
        }

        tokio::time::advance(Duration::from_millis(60_001)).await;

        assert!(!breakers.is_open("rpc"));
        assert_eq!(breakers.attempt_slot("rpc"), SlotDecision::Probe);
        assert_eq!(breakers.state("rpc"), CircuitState::HalfOpen);
        assert_eq!(breakers.attempt_slot("rpc"), SlotDecision::Denied);
        assert!(breakers.is_open("rpc"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens_with_fresh_timer() {
        let breakers = registry();
        for _ in 0..3 {
            breakers.record_failure("dune");
        }

        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert_eq!(breakers.attempt_slot("dune"), SlotDecision::Probe);
        breakers.record_failure("dune");

        assert_eq!(breakers.state("dune"), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breakers.attempt_slot("dune"), SlotDecision::Denied);

        tokio::time::advance(Duration::from_millis(30_001)).await;
        assert_eq!(breakers.attempt_slot("dune"), SlotDecision::Probe);
    }

    #[tokio::test(start_paused = true)]
    async fn unreported_half_open_attempt_is_reissued_after_recovery_window() {
        // Given: The half-open slot was handed out and never reported
        let breakers = registry();
        for _ in 0..3 {
            breakers.record_failure("growthepie");
        }
        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert_eq!(breakers.attempt_slot("growthepie"), SlotDecision::Probe);

        // When: Half a window passes, then the rest of it
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breakers.attempt_slot("growthepie"), SlotDecision::Denied);
        tokio::time::advance(Duration::from_millis(30_001)).await;

        // Then: Exactly one new caller gets the slot
        assert!(!breakers.is_open("growthepie"));
        assert_eq!(breakers.attempt_slot("growthepie"), SlotDecision::Probe);
        assert_eq!(breakers.attempt_slot("growthepie"), SlotDecision::Denied);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_probe_closes_circuit() {
        let breakers = registry();
        for _ in 0..3 {
            breakers.record_failure("defillama");
        }

        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert_eq!(breakers.attempt_slot("defillama"), SlotDecision::Probe);
        breakers.record_success("defillama");

        assert_eq!(breakers.state("defillama"), CircuitState::Closed);
        assert_eq!(breakers.consecutive_failures("defillama"), 0);
        assert_eq!(breakers.attempt_slot("defillama"), SlotDecision::Allowed);
    }

    #[test]
    fn snapshot_lists_every_referenced_provider() {
        let breakers = registry();
        breakers.record_success("coingecko");
        for _ in 0..3 {
            breakers.record_failure("etherscan");
        }

        let snapshot = breakers.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot["coingecko"].is_open);
        assert!(snapshot["etherscan"].is_open);
        assert_eq!(snapshot["etherscan"].failures, 3);
        assert_eq!(snapshot["etherscan"].state, CircuitState::Open);
    }
}
