use std::time::Duration;

use crate::ProviderId;

/// Response-cache TTLs per use case.
pub mod ttl {
    use std::time::Duration;

    pub const PRICE: Duration = Duration::from_secs(30);
    pub const TVL: Duration = Duration::from_secs(300);
    pub const BLOBS: Duration = Duration::from_secs(60);
    pub const QUERY_RESULTS: Duration = Duration::from_secs(300);
    /// Data addressed by hash or fixed block number.
    pub const IMMUTABLE_CHAIN_DATA: Duration = Duration::from_secs(300);
    /// Head-of-chain reads (balances at latest, gas price, block number).
    pub const LIVE_CHAIN_DATA: Duration = Duration::ZERO;
}

/// Upstream request budget for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub request_timeout: Duration,
}

impl ProviderPolicy {
    const fn new(provider_id: ProviderId, quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            provider_id,
            quota_window,
            quota_limit,
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            // Free tier: 5 calls per second.
            ProviderId::Etherscan => Self::new(provider_id, Duration::from_secs(1), 5),
            // Public demo tier: 30 calls per minute.
            ProviderId::Coingecko => Self::new(provider_id, Duration::from_secs(60), 30),
            ProviderId::Defillama => Self::new(provider_id, Duration::from_secs(60), 300),
            ProviderId::Growthepie => Self::new(provider_id, Duration::from_secs(60), 60),
            ProviderId::Blobscan => Self::new(provider_id, Duration::from_secs(60), 60),
            ProviderId::Dune => Self::new(provider_id, Duration::from_secs(60), 40),
            ProviderId::Rpc => Self {
                request_timeout: Duration::from_secs(10),
                ..Self::new(provider_id, Duration::from_secs(1), 100)
            },
        }
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout.as_millis().min(u128::from(u64::MAX)) as u64
    }
}
