//! Core contracts for chainscope.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Provider identifiers and upstream adapters
//! - Per-provider circuit breaking and ordered fallback
//! - Result normalizers and the [`Router`] entry point
//! - Response envelope and structured errors

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fallback;
pub mod http_client;
pub mod normalize;
pub mod provider_policy;
pub mod routing;
pub mod source;
pub mod throttling;

pub use adapters::{
    BlobscanAdapter, CoingeckoAdapter, DefillamaAdapter, DuneAdapter, DuneQueryResults,
    EtherscanAdapter, GrowthepieAdapter, RpcNodeAdapter, MAX_MULTI_BALANCE_ADDRESSES,
};
pub use cache::{CacheMode, CacheStore};
pub use circuit_breaker::{
    CircuitBreakerConfig, CircuitBreakerRegistry, CircuitSnapshot, CircuitState, SlotDecision,
};
pub use config::ChainscopeConfig;
pub use data_source::{DataSource, SourceError, SourceErrorKind, SourceFuture};
pub use domain::{
    canonical_coin_id, looks_like_address, parse_hex_quantity, AccountBalance, Address, BlockTag,
    Chain, HealthReport, HexData, LogFilter, NormalizedBlobStats, NormalizedPrice, NormalizedTvl,
    PriceComparison, Routed, SourceHealth, SourceQuote, TokenQuery, TxHash, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ValidationError};
pub use fallback::{
    AttemptFailure, FallbackExecutor, FallbackOutcome, ProviderAttempt, RouteError, Validator,
    DEFAULT_ATTEMPT_TIMEOUT,
};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use provider_policy::ProviderPolicy;
pub use routing::{Router, RouterBuilder};
pub use source::ProviderId;
pub use throttling::Throttle;
