//! Contract every provider adapter honours through the `DataSource` trait.
//!
//! Each case wires an adapter to a healthy scripted upstream and to one that
//! answers every request with a server error.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use chainscope_core::{
    BlobscanAdapter, CoingeckoAdapter, DataSource, DefillamaAdapter, DuneAdapter,
    EtherscanAdapter, GrowthepieAdapter, ProviderId, RpcNodeAdapter, SourceErrorKind,
};
use support::{defillama_price, etherscan_ok, rpc_ok, ScriptedHttp, NODE_URL};

struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn DataSource>,
}

fn healthy_upstream() -> Arc<ScriptedHttp> {
    ScriptedHttp::new()
        .json("api.coingecko.com/api/v3/ping", r#"{"gecko_says":"(V3) To the Moon!"}"#)
        .json("prices/current/coingecko:ethereum", &defillama_price("coingecko:ethereum", 3_000.0))
        .json(
            "fundamentals.json",
            r#"[{"metric_key":"tvl","origin_key":"base","date":"2024-05-02","value":7100000000.0}]"#,
        )
        .json(
            "api.blobscan.com/blobs?ps=1",
            r#"{"blobs":[{"versionedHash":"0x01a","size":131072}],"totalBlobs":1}"#,
        )
        .status("api.dune.com/api/v1/query/1/results", 404)
        .json("module=proxy&action=eth_blockNumber", &etherscan_ok(r#""0x12a05f2""#))
        .json(r#""method":"eth_blockNumber""#, &rpc_ok(r#""0x12a05f2""#))
}

fn failing_upstream() -> Arc<ScriptedHttp> {
    ScriptedHttp::new().status("http", 503)
}

fn provider_cases(http: &Arc<ScriptedHttp>) -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Rpc,
            source: Arc::new(RpcNodeAdapter::with_http_client(http.clone(), NODE_URL, Some(1))),
        },
        ProviderCase {
            id: ProviderId::Etherscan,
            source: Arc::new(EtherscanAdapter::with_http_client(
                http.clone(),
                Some(String::from("explorer-key")),
            )),
        },
        ProviderCase {
            id: ProviderId::Coingecko,
            source: Arc::new(CoingeckoAdapter::with_http_client(http.clone(), None)),
        },
        ProviderCase {
            id: ProviderId::Defillama,
            source: Arc::new(DefillamaAdapter::with_http_client(http.clone())),
        },
        ProviderCase {
            id: ProviderId::Growthepie,
            source: Arc::new(GrowthepieAdapter::with_http_client(http.clone())),
        },
        ProviderCase {
            id: ProviderId::Blobscan,
            source: Arc::new(BlobscanAdapter::with_http_client(http.clone())),
        },
        ProviderCase {
            id: ProviderId::Dune,
            source: Arc::new(DuneAdapter::with_http_client(
                http.clone(),
                Some(String::from("dune-key")),
            )),
        },
    ]
}

#[test]
fn every_provider_reports_its_own_id() {
    let http = ScriptedHttp::new();
    let ids = provider_cases(&http)
        .iter()
        .map(|case| {
            assert_eq!(case.source.id(), case.id, "provider '{}': id", case.id);
            case.id
        })
        .collect::<Vec<_>>();

    assert_eq!(ids, ProviderId::ALL.to_vec());
}

#[test]
fn configured_providers_report_configured() {
    let http = ScriptedHttp::new();
    for case in provider_cases(&http) {
        assert!(case.source.is_configured(), "provider '{}': configured", case.id);
    }
}

#[test]
fn keyed_providers_without_keys_report_unconfigured() {
    let http = ScriptedHttp::new();

    assert!(!EtherscanAdapter::with_http_client(http.clone(), None).is_configured());
    assert!(!DuneAdapter::with_http_client(http.clone(), None).is_configured());
    assert!(!RpcNodeAdapter::with_http_client(http.clone(), "  ", None).is_configured());
    assert!(CoingeckoAdapter::with_http_client(http.clone(), None).is_configured());
}

#[tokio::test]
async fn probe_succeeds_against_healthy_upstreams() {
    let http = healthy_upstream();

    for case in provider_cases(&http) {
        case.source
            .probe()
            .await
            .unwrap_or_else(|error| panic!("provider '{}' probe failed: {error}", case.id));
    }
}

#[tokio::test]
async fn probe_reports_unavailable_for_failing_upstreams() {
    let http = failing_upstream();

    for case in provider_cases(&http) {
        let error = case
            .source
            .probe()
            .await
            .expect_err("server errors fail the probe");
        assert_eq!(
            error.kind(),
            SourceErrorKind::Unavailable,
            "provider '{}': kind",
            case.id
        );
        assert_eq!(
            error.to_string(),
            format!("{} returned status 503", case.id),
            "provider '{}': message",
            case.id
        );
    }
}

#[tokio::test]
async fn probes_always_reach_the_upstream() {
    let http = healthy_upstream();
    let cases = provider_cases(&http);

    for case in &cases {
        case.source.probe().await.expect("healthy");
    }
    for case in &cases {
        case.source.probe().await.expect("healthy");
    }

    assert_eq!(http.calls("/ping"), 2);
    assert_eq!(http.calls("fundamentals.json"), 2);
    assert_eq!(http.calls("api.blobscan.com"), 2);
}

#[tokio::test]
async fn keyless_explorer_probe_is_not_configured_and_sends_nothing() {
    let http = healthy_upstream();
    let explorer = EtherscanAdapter::with_http_client(http.clone(), None);

    let error = explorer.probe().await.expect_err("no key");

    assert_eq!(error.kind(), SourceErrorKind::NotConfigured);
    assert_eq!(error.to_string(), "etherscan requires ETHERSCAN_API_KEY");
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn dune_probe_flags_rejected_keys() {
    let http = ScriptedHttp::new().status("api.dune.com", 401);
    let dune = DuneAdapter::with_http_client(http.clone(), Some(String::from("revoked")));

    let error = dune.probe().await.expect_err("rejected key");

    assert_eq!(error.kind(), SourceErrorKind::NotConfigured);
}
