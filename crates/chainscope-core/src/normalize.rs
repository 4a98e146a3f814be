//! Raw provider payloads and their canonical shapes.
//!
//! Each routed use case has a tagged raw type naming every provider that can
//! answer it, a normalizer that maps each variant exhaustively, and a
//! validator the fallback executor applies to the normalized value.

use std::collections::BTreeMap;

use crate::adapters::{
    BlobscanBlobs, CoingeckoQuote, DefillamaChainTvl, DefillamaCoinPrice, DefillamaProtocol,
    EtherscanEthPrice, GrowthepieMetric,
};
use crate::data_source::SourceError;
use crate::{NormalizedBlobStats, NormalizedPrice, NormalizedTvl, UtcDateTime};

/// Average blob size assumed when only blob counts are known (one full blob).
pub const ASSUMED_BLOB_SIZE_BYTES: f64 = 131_072.0;

/// DefiLlama `currentChainTvls` keys that are not part of headline TVL.
const EXCLUDED_TVL_CATEGORIES: [&str; 6] = [
    "borrowed",
    "staking",
    "pool2",
    "vesting",
    "doublecounted",
    "liquidstaking",
];

#[derive(Debug, Clone, PartialEq)]
pub enum RawPrice {
    Coingecko(CoingeckoQuote),
    Defillama(DefillamaCoinPrice),
    Etherscan(EtherscanEthPrice),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawTvl {
    /// Growthepie rows for the `tvl` metric, matched against `chain`.
    GrowthepieMetrics {
        chain: String,
        rows: Vec<GrowthepieMetric>,
    },
    /// DefiLlama chain list, matched against `chain`.
    DefillamaChains {
        chain: String,
        chains: Vec<DefillamaChainTvl>,
    },
    DefillamaProtocol(DefillamaProtocol),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawBlobStats {
    Blobscan(BlobscanBlobs),
    /// Growthepie `blob_count` rows across every chain.
    GrowthepieBlobCounts(Vec<GrowthepieMetric>),
}

pub fn price(raw: RawPrice) -> Result<NormalizedPrice, SourceError> {
    match raw {
        RawPrice::Coingecko(quote) => {
            let price = quote
                .usd
                .ok_or_else(|| SourceError::invalid_response("coingecko quote has no usd price"))?;
            Ok(NormalizedPrice {
                change_24h_percent: quote.usd_24h_change,
                market_cap_usd: quote.usd_market_cap,
                ..NormalizedPrice::usd(price)
            })
        }
        RawPrice::Defillama(coin) => {
            let as_of = coin
                .timestamp
                .map(|seconds| {
                    i64::try_from(seconds)
                        .map_err(|_| {
                            SourceError::invalid_response(format!(
                                "defillama timestamp out of range: {seconds}"
                            ))
                        })
                        .and_then(quote_time)
                })
                .transpose()?;
            Ok(NormalizedPrice {
                as_of,
                ..NormalizedPrice::usd(coin.price)
            })
        }
        RawPrice::Etherscan(stats) => {
            let price = stats.ethusd.trim().parse::<f64>().map_err(|_| {
                SourceError::invalid_response(format!(
                    "etherscan ethusd is not a number: '{}'",
                    stats.ethusd
                ))
            })?;
            let as_of = match stats.ethusd_timestamp.as_deref().map(str::trim) {
                Some(raw) => {
                    let seconds = raw.parse::<i64>().map_err(|_| {
                        SourceError::invalid_response(format!(
                            "etherscan ethusd_timestamp is not unix seconds: '{raw}'"
                        ))
                    })?;
                    Some(quote_time(seconds)?)
                }
                None => None,
            };
            Ok(NormalizedPrice {
                as_of,
                ..NormalizedPrice::usd(price)
            })
        }
    }
}

fn quote_time(seconds: i64) -> Result<UtcDateTime, SourceError> {
    UtcDateTime::from_unix_seconds(seconds)
        .map_err(|error| SourceError::invalid_response(format!("quote timestamp: {error}")))
}

pub fn tvl(raw: RawTvl) -> Result<NormalizedTvl, SourceError> {
    match raw {
        RawTvl::GrowthepieMetrics { chain, rows } => {
            let key = growthepie_origin(&chain);
            let latest = rows
                .into_iter()
                .filter(|row| row.metric_key == GrowthepieMetric::TVL)
                .filter(|row| {
                    row.origin_key.eq_ignore_ascii_case(&key)
                        || row.origin_key.eq_ignore_ascii_case(chain.trim())
                })
                .max_by(|left, right| left.date.cmp(&right.date))
                .ok_or_else(|| {
                    SourceError::invalid_response(format!("growthepie has no tvl for '{chain}'"))
                })?;

            Ok(NormalizedTvl {
                tvl_usd: latest.value,
                breakdown: None,
            })
        }
        RawTvl::DefillamaChains { chain, chains } => {
            let wanted = chain.trim();
            let found = chains
                .into_iter()
                .find(|candidate| candidate.name.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| {
                    SourceError::invalid_response(format!("defillama has no tvl for '{chain}'"))
                })?;

            Ok(NormalizedTvl {
                tvl_usd: found.tvl,
                breakdown: None,
            })
        }
        RawTvl::DefillamaProtocol(protocol) => {
            let breakdown = protocol
                .current_chain_tvls
                .into_iter()
                .filter(|(key, _)| is_headline_tvl_key(key))
                .collect::<BTreeMap<_, _>>();

            let tvl_usd = if breakdown.is_empty() {
                protocol
                    .tvl
                    .last()
                    .map(|point| point.total_liquidity_usd)
                    .ok_or_else(|| {
                        SourceError::invalid_response(format!(
                            "defillama protocol '{}' has no tvl data",
                            protocol.name
                        ))
                    })?
            } else {
                breakdown.values().sum()
            };

            Ok(NormalizedTvl {
                tvl_usd,
                breakdown: (!breakdown.is_empty()).then_some(breakdown),
            })
        }
    }
}

pub fn blob_stats(raw: RawBlobStats) -> Result<NormalizedBlobStats, SourceError> {
    match raw {
        RawBlobStats::Blobscan(page) => {
            let count = page.blobs.len();
            let average = if count == 0 {
                0.0
            } else {
                page.blobs.iter().map(|blob| blob.size as f64).sum::<f64>() / count as f64
            };

            Ok(NormalizedBlobStats {
                recent_blob_count: count as u64,
                average_blob_size_bytes: average,
            })
        }
        RawBlobStats::GrowthepieBlobCounts(rows) => {
            let counts = rows
                .into_iter()
                .filter(|row| row.metric_key == GrowthepieMetric::BLOB_COUNT)
                .collect::<Vec<_>>();
            let latest_day = counts
                .iter()
                .map(|row| row.date.as_str())
                .max()
                .ok_or_else(|| SourceError::invalid_response("growthepie has no blob_count rows"))?
                .to_owned();

            let total = counts
                .iter()
                .filter(|row| row.date == latest_day)
                .map(|row| row.value.max(0.0))
                .sum::<f64>();

            Ok(NormalizedBlobStats {
                recent_blob_count: total.round() as u64,
                average_blob_size_bytes: ASSUMED_BLOB_SIZE_BYTES,
            })
        }
    }
}

pub fn validate_price(price: &NormalizedPrice) -> Result<(), String> {
    if price.price.is_finite() && price.price > 0.0 {
        Ok(())
    } else {
        Err(format!("invalid price {}", price.price))
    }
}

pub fn validate_tvl(tvl: &NormalizedTvl) -> Result<(), String> {
    if tvl.tvl_usd.is_finite() && tvl.tvl_usd >= 0.0 {
        Ok(())
    } else {
        Err(format!("invalid tvl {}", tvl.tvl_usd))
    }
}

pub fn validate_blob_stats(stats: &NormalizedBlobStats) -> Result<(), String> {
    let size = stats.average_blob_size_bytes;
    if size.is_finite() && size >= 0.0 {
        Ok(())
    } else {
        Err(format!("invalid average blob size {size}"))
    }
}

/// Growthepie origin keys use snake_case (`zksync_era`, `polygon_zkevm`).
fn growthepie_origin(chain: &str) -> String {
    let normalized = chain.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "zksync" | "era" => String::from("zksync_era"),
        "arbitrum_one" => String::from("arbitrum"),
        "op_mainnet" | "op" => String::from("optimism"),
        _ => normalized,
    }
}

fn is_headline_tvl_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    if lowered.contains('-') {
        return false;
    }
    !EXCLUDED_TVL_CATEGORIES.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{BlobscanBlob, DefillamaTvlPoint};

    fn metric(key: &str, origin: &str, date: &str, value: f64) -> GrowthepieMetric {
        GrowthepieMetric {
            metric_key: key.to_owned(),
            origin_key: origin.to_owned(),
            date: date.to_owned(),
            value,
        }
    }

    #[test]
    fn coingecko_quote_keeps_change_and_market_cap() {
        let price = price(RawPrice::Coingecko(CoingeckoQuote {
            usd: Some(3000.0),
            usd_24h_change: Some(2.5),
            usd_market_cap: Some(1.0e11),
        }))
        .expect("normalizes");

        assert_eq!(price.price, 3000.0);
        assert_eq!(price.currency, "USD");
        assert_eq!(price.change_24h_percent, Some(2.5));
        assert_eq!(price.market_cap_usd, Some(1.0e11));
    }

    #[test]
    fn etherscan_string_price_is_parsed() {
        let price = price(RawPrice::Etherscan(EtherscanEthPrice {
            ethusd: String::from("3006.12"),
            ethbtc: None,
            ethusd_timestamp: None,
        }))
        .expect("normalizes");
        assert_eq!(price.price, 3006.12);

        let error = super::price(RawPrice::Etherscan(EtherscanEthPrice {
            ethusd: String::from("n/a"),
            ethbtc: None,
            ethusd_timestamp: None,
        }))
        .expect_err("not numeric");
        assert!(error.message().contains("n/a"));
    }

    // =========================================================================
    // Quote timestamps
    // =========================================================================

    #[test]
    fn provider_update_times_become_utc_quote_times() {
        // Given: Quotes stamped by the explorer and the aggregator
        let explorer = EtherscanEthPrice {
            ethusd: String::from("3012.5"),
            ethbtc: Some(String::from("0.05")),
            ethusd_timestamp: Some(String::from("1710288000")),
        };
        let aggregator = DefillamaCoinPrice {
            price: 3004.1,
            symbol: Some(String::from("ETH")),
            timestamp: Some(1_710_288_060),
            confidence: Some(0.99),
        };

        // When: Both are normalized
        let explorer = price(RawPrice::Etherscan(explorer)).expect("normalizes");
        let aggregator = price(RawPrice::Defillama(aggregator)).expect("normalizes");

        // Then: Each carries its update time as an RFC3339 UTC instant
        let explorer_at = explorer.as_of.expect("explorer time");
        let aggregator_at = aggregator.as_of.expect("aggregator time");
        assert_eq!(explorer_at.to_string(), "2024-03-13T00:00:00Z");
        assert_eq!(aggregator_at.to_string(), "2024-03-13T00:01:00Z");
        assert!(explorer_at < aggregator_at);
    }

    #[test]
    fn garbled_explorer_timestamp_is_an_invalid_response() {
        let error = price(RawPrice::Etherscan(EtherscanEthPrice {
            ethusd: String::from("3012.5"),
            ethbtc: None,
            ethusd_timestamp: Some(String::from("yesterday")),
        }))
        .expect_err("not unix seconds");

        assert!(error.message().contains("yesterday"));
    }

    #[test]
    fn quotes_without_update_time_have_none() {
        let quote = price(RawPrice::Coingecko(CoingeckoQuote {
            usd: Some(1.0),
            usd_24h_change: None,
            usd_market_cap: None,
        }))
        .expect("normalizes");

        assert_eq!(quote.as_of, None);
        let json = serde_json::to_value(&quote).expect("serializes");
        assert!(json.get("as_of").is_none());
    }

    #[test]
    fn price_validator_rejects_zero_negative_and_nan() {
        assert!(validate_price(&NormalizedPrice::usd(0.01)).is_ok());
        assert!(validate_price(&NormalizedPrice::usd(0.0)).is_err());
        assert!(validate_price(&NormalizedPrice::usd(-3.0)).is_err());
        assert!(validate_price(&NormalizedPrice::usd(f64::NAN)).is_err());
    }

    #[test]
    fn growthepie_tvl_matches_case_insensitively_and_takes_latest_day() {
        let tvl = tvl(RawTvl::GrowthepieMetrics {
            chain: String::from("Arbitrum"),
            rows: vec![
                metric("tvl", "arbitrum", "2024-04-30", 14.0),
                metric("tvl", "arbitrum", "2024-05-01", 15.0),
                metric("tvl", "optimism", "2024-05-01", 7.0),
                metric("txcount", "arbitrum", "2024-05-02", 99.0),
            ],
        })
        .expect("normalizes");

        assert_eq!(tvl.tvl_usd, 15.0);
    }

    #[test]
    fn growthepie_maps_common_chain_names_to_origin_keys() {
        let tvl = tvl(RawTvl::GrowthepieMetrics {
            chain: String::from("zkSync"),
            rows: vec![metric("tvl", "zksync_era", "2024-05-01", 800.0)],
        })
        .expect("normalizes");

        assert_eq!(tvl.tvl_usd, 800.0);
    }

    #[test]
    fn defillama_chain_list_matches_case_insensitively() {
        let tvl = tvl(RawTvl::DefillamaChains {
            chain: String::from("ARBITRUM"),
            chains: vec![
                DefillamaChainTvl {
                    name: String::from("Ethereum"),
                    tvl: 60.0,
                    token_symbol: Some(String::from("ETH")),
                },
                DefillamaChainTvl {
                    name: String::from("Arbitrum"),
                    tvl: 2.8,
                    token_symbol: None,
                },
            ],
        })
        .expect("normalizes");

        assert_eq!(tvl.tvl_usd, 2.8);
    }

    #[test]
    fn unknown_chain_is_an_invalid_response() {
        let error = tvl(RawTvl::DefillamaChains {
            chain: String::from("nowhere"),
            chains: Vec::new(),
        })
        .expect_err("no match");

        assert_eq!(error.message(), "defillama has no tvl for 'nowhere'");
    }

    #[test]
    fn protocol_tvl_sums_headline_chains_only() {
        let tvl = tvl(RawTvl::DefillamaProtocol(DefillamaProtocol {
            name: String::from("Aave"),
            current_chain_tvls: BTreeMap::from([
                (String::from("Ethereum"), 100.0),
                (String::from("Arbitrum"), 20.0),
                (String::from("Ethereum-borrowed"), 50.0),
                (String::from("borrowed"), 60.0),
                (String::from("staking"), 5.0),
            ]),
            tvl: Vec::new(),
        }))
        .expect("normalizes");

        assert_eq!(tvl.tvl_usd, 120.0);
        let breakdown = tvl.breakdown.expect("breakdown present");
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["Arbitrum"], 20.0);
    }

    #[test]
    fn protocol_without_chain_map_uses_last_series_point() {
        let tvl = tvl(RawTvl::DefillamaProtocol(DefillamaProtocol {
            name: String::from("Tiny"),
            current_chain_tvls: BTreeMap::new(),
            tvl: vec![
                DefillamaTvlPoint {
                    date: 1,
                    total_liquidity_usd: 1.0,
                },
                DefillamaTvlPoint {
                    date: 2,
                    total_liquidity_usd: 2.0,
                },
            ],
        }))
        .expect("normalizes");

        assert_eq!(tvl.tvl_usd, 2.0);
        assert_eq!(tvl.breakdown, None);
    }

    #[test]
    fn blobscan_page_averages_sizes() {
        let stats = blob_stats(RawBlobStats::Blobscan(BlobscanBlobs {
            blobs: vec![
                BlobscanBlob {
                    versioned_hash: String::from("0x01"),
                    size: 131_072,
                },
                BlobscanBlob {
                    versioned_hash: String::from("0x02"),
                    size: 65_536,
                },
            ],
            total_blobs: None,
        }))
        .expect("normalizes");

        assert_eq!(stats.recent_blob_count, 2);
        assert_eq!(stats.average_blob_size_bytes, 98_304.0);
    }

    #[test]
    fn growthepie_blob_counts_sum_latest_day_with_assumed_size() {
        let stats = blob_stats(RawBlobStats::GrowthepieBlobCounts(vec![
            metric("blob_count", "base", "2024-05-01", 2000.0),
            metric("blob_count", "arbitrum", "2024-05-01", 500.0),
            metric("blob_count", "base", "2024-04-30", 9999.0),
            metric("tvl", "base", "2024-05-01", 1.0),
        ]))
        .expect("normalizes");

        assert_eq!(stats.recent_blob_count, 2500);
        assert_eq!(stats.average_blob_size_bytes, ASSUMED_BLOB_SIZE_BYTES);
    }

    #[test]
    fn empty_blobscan_page_is_valid() {
        let stats = blob_stats(RawBlobStats::Blobscan(BlobscanBlobs {
            blobs: Vec::new(),
            total_blobs: Some(0),
        }))
        .expect("normalizes");

        assert_eq!(stats.recent_blob_count, 0);
        assert!(validate_blob_stats(&stats).is_ok());
    }
}
