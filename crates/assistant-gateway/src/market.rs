//! Live market data: ETH price, gas oracle and protocol figures
//!
//! Every source is best-effort. A missing gas oracle keeps the default gas
//! tiers; a missing ETH price turns the whole gas report into fallback data.
//! Protocol TVL, fees and revenue fall back to fixed demo figures.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staking_calc::{FALLBACK_ETH_PRICE_USD, GasPrices, OperationEstimates};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::constants;
use crate::request::parse_lenient_number;

/// DeFiLlama current price response
#[derive(Debug, Deserialize)]
struct LlamaPricesResponse {
    #[serde(default)]
    coins: HashMap<String, LlamaCoin>,
}

#[derive(Debug, Deserialize)]
struct LlamaCoin {
    price: Option<f64>,
}

/// Etherscan gas oracle response. `result` is a string on errors.
#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    status: Option<String>,
    result: Option<Value>,
}

/// Body of `GET /api/defi/gas-prices`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceReport {
    pub success: bool,
    pub gas_price: GasPrices,
    pub estimates: OperationEstimates,
    pub eth_price: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

impl GasPriceReport {
    /// Report priced at the standard gas tier
    pub fn live(gas_price: GasPrices, eth_price: f64, now: DateTime<Utc>) -> Self {
        Self {
            success: true,
            gas_price,
            estimates: OperationEstimates::at(gas_price.standard, eth_price),
            eth_price,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            fallback: None,
        }
    }

    /// Report built entirely from default gas tiers and ETH price
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            fallback: Some(true),
            ..Self::live(GasPrices::default(), FALLBACK_ETH_PRICE_USD, now)
        }
    }
}

/// Pull gas tiers out of an oracle `result` object; bad fields keep defaults
fn parse_gas_oracle(result: &Value) -> GasPrices {
    let defaults = GasPrices::default();
    let field = |name: &str, default: f64| {
        result
            .get(name)
            .and_then(|v| match v {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            })
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(default)
    };

    GasPrices {
        slow: field("SafeGasPrice", defaults.slow),
        standard: field("ProposeGasPrice", defaults.standard),
        fast: field("FastGasPrice", defaults.fast),
    }
}

/// Protocol TVL, fees and revenue (USD), the figures the assistant quotes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSnapshot {
    pub name: String,
    pub tvl: Option<f64>,
    #[serde(rename = "fees24h")]
    pub fees_24h: Option<f64>,
    #[serde(rename = "revenue24h")]
    pub revenue_24h: Option<f64>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

impl ProtocolSnapshot {
    /// Demo figures used when DeFiLlama cannot be reached
    pub fn fallback(now: DateTime<Utc>) -> Self {
        Self {
            name: constants::FALLBACK_PROTOCOL_NAME.to_string(),
            tvl: Some(constants::FALLBACK_PROTOCOL_TVL),
            fees_24h: Some(constants::FALLBACK_PROTOCOL_FEES_24H),
            revenue_24h: Some(constants::FALLBACK_PROTOCOL_REVENUE_24H),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            fallback: Some(true),
        }
    }
}

/// Current TVL from a protocol detail body.
///
/// `tvl` is either a number (or numeric string) or a history of
/// `{date, totalLiquidityUSD}` points, in which case the latest point wins.
fn parse_protocol_tvl(tvl: &Value) -> Option<f64> {
    match tvl {
        Value::Array(points) => points
            .last()
            .and_then(|point| point.get("totalLiquidityUSD"))
            .and_then(parse_lenient_number),
        other => parse_lenient_number(other),
    }
}

/// Snapshot from a protocol detail body, or `None` when it carries no `tvl`
fn parse_protocol_detail(data: &Value, now: DateTime<Utc>) -> Option<ProtocolSnapshot> {
    let tvl = data.get("tvl")?;
    let metric = |name: &str| data.get("metrics").and_then(|m| m.get(name)).and_then(parse_lenient_number);

    Some(ProtocolSnapshot {
        name: data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(constants::FALLBACK_PROTOCOL_NAME)
            .to_string(),
        tvl: parse_protocol_tvl(tvl),
        fees_24h: metric("fees24h"),
        revenue_24h: metric("revenue24h"),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        fallback: None,
    })
}

/// Slug of the first listed protocol whose name or slug matches ours
fn find_protocol_slug(protocols: &[Value]) -> Option<String> {
    protocols
        .iter()
        .find(|p| {
            let name = p.get("name").and_then(Value::as_str).unwrap_or_default().to_lowercase();
            let slug = p.get("slug").and_then(Value::as_str).unwrap_or_default();
            constants::PROTOCOL_NAME_MATCHES.iter().any(|m| name.contains(m))
                || constants::PROTOCOL_SLUGS.contains(&slug)
        })
        .and_then(|p| p.get("slug").and_then(Value::as_str))
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
}

/// Last value stored and when
struct TtlCache<T> {
    entry: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    fn new() -> Self {
        Self { entry: Mutex::new(None) }
    }

    fn get(&self, ttl: Duration) -> Option<T> {
        let entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|(at, _)| at.elapsed() < ttl)
            .map(|(_, value)| value.clone())
    }

    fn put(&self, value: T) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some((Instant::now(), value));
    }
}

/// Market data client with short-lived report caches
pub struct MarketClient {
    client: reqwest::Client,
    prices_url: String,
    price_key: String,
    gas_oracle_url: String,
    protocol_api_url: String,
    ttl: Duration,
    gas_cache: TtlCache<GasPriceReport>,
    protocol_cache: TtlCache<ProtocolSnapshot>,
}

impl MarketClient {
    pub fn new(
        prices_url: impl Into<String>,
        price_key: impl Into<String>,
        gas_oracle_url: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::MARKET_TIMEOUT_SECS))
            .build()
            .context("Failed to build market data HTTP client")?;

        Ok(Self::with_client(client, prices_url, price_key, gas_oracle_url))
    }

    pub fn with_client(
        client: reqwest::Client,
        prices_url: impl Into<String>,
        price_key: impl Into<String>,
        gas_oracle_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prices_url: prices_url.into(),
            price_key: price_key.into(),
            gas_oracle_url: gas_oracle_url.into(),
            protocol_api_url: constants::LLAMA_API_URL.to_string(),
            ttl: Duration::from_secs(constants::MARKET_REPORT_TTL_SECS),
            gas_cache: TtlCache::new(),
            protocol_cache: TtlCache::new(),
        }
    }

    /// Point protocol lookups at another DeFiLlama-compatible API base
    pub fn with_protocol_api(mut self, base_url: impl Into<String>) -> Self {
        self.protocol_api_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Client for the public DeFiLlama and Etherscan endpoints
    pub fn public() -> Result<Self> {
        Self::new(
            format!("{}{}", constants::LLAMA_PRICES_URL, constants::WETH_PRICE_KEY),
            constants::WETH_PRICE_KEY,
            constants::ETHERSCAN_GAS_ORACLE_URL,
        )
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current ETH price in USD. A response without our coin yields the fallback price.
    pub async fn fetch_eth_price(&self) -> Result<f64> {
        let response = self
            .client
            .get(&self.prices_url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("ETH price request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("ETH price API returned status: {}", response.status());
        }

        let data: LlamaPricesResponse = response.json().await.context("Failed to parse ETH price response")?;

        Ok(data
            .coins
            .get(&self.price_key)
            .and_then(|coin| coin.price)
            .unwrap_or(FALLBACK_ETH_PRICE_USD))
    }

    /// Gas tiers from the oracle
    pub async fn fetch_gas_prices(&self) -> Result<GasPrices> {
        let response = self
            .client
            .get(&self.gas_oracle_url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Gas oracle request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Gas oracle returned status: {}", response.status());
        }

        let data: GasOracleResponse = response.json().await.context("Failed to parse gas oracle response")?;

        match (data.status.as_deref(), data.result) {
            (Some("1"), Some(result)) if result.is_object() => Ok(parse_gas_oracle(&result)),
            (status, _) => anyhow::bail!("Gas oracle returned no data (status {:?})", status),
        }
    }

    /// Build a fresh report, falling back as each source fails
    pub async fn fetch_report(&self) -> GasPriceReport {
        let eth_price = match self.fetch_eth_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!("Using fallback gas report: {:#}", e);
                return GasPriceReport::fallback(Utc::now());
            }
        };

        let gas_prices = self.fetch_gas_prices().await.unwrap_or_else(|e| {
            debug!("Using fallback gas prices: {:#}", e);
            GasPrices::default()
        });

        GasPriceReport::live(gas_prices, eth_price, Utc::now())
    }

    /// Cached report, refetched once older than the TTL
    pub async fn gas_report(&self) -> GasPriceReport {
        if let Some(report) = self.gas_cache.get(self.ttl) {
            return report;
        }

        let report = self.fetch_report().await;
        self.gas_cache.put(report.clone());
        report
    }

    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("{} returned status: {}", url, response.status());
        }

        let data = response.json().await.with_context(|| format!("Failed to parse {}", url))?;
        Ok(Some(data))
    }

    /// Detail for one slug; `None` on 404 or a body without `tvl`
    async fn fetch_protocol_detail(&self, slug: &str) -> Result<Option<ProtocolSnapshot>> {
        let url = format!("{}/protocol/{}", self.protocol_api_url, slug);
        Ok(self
            .get_json(&url)
            .await?
            .and_then(|data| parse_protocol_detail(&data, Utc::now())))
    }

    /// Look the protocol up in the full list, then fetch its detail
    async fn search_protocol(&self) -> Result<Option<ProtocolSnapshot>> {
        let url = format!("{}/protocols", self.protocol_api_url);
        let slug = match self.get_json(&url).await? {
            Some(Value::Array(protocols)) => find_protocol_slug(&protocols),
            _ => None,
        };

        match slug {
            Some(slug) => self.fetch_protocol_detail(&slug).await,
            None => Ok(None),
        }
    }

    /// Protocol figures: list search, then known slugs, then demo figures
    pub async fn fetch_protocol_snapshot(&self) -> ProtocolSnapshot {
        match self.search_protocol().await {
            Ok(Some(snapshot)) => return snapshot,
            Ok(None) => debug!("protocol not found in DeFiLlama list, trying known slugs"),
            Err(e) => debug!("protocol list search failed: {:#}", e),
        }

        for slug in constants::PROTOCOL_SLUGS {
            match self.fetch_protocol_detail(slug).await {
                Ok(Some(snapshot)) => return snapshot,
                Ok(None) => continue,
                Err(e) => debug!("protocol lookup for {} failed: {:#}", slug, e),
            }
        }

        warn!("DeFiLlama unavailable, using demo protocol figures");
        ProtocolSnapshot::fallback(Utc::now())
    }

    /// Cached protocol snapshot, refetched once older than the TTL
    pub async fn protocol_snapshot(&self) -> ProtocolSnapshot {
        if let Some(snapshot) = self.protocol_cache.get(self.ttl) {
            return snapshot;
        }

        let snapshot = self.fetch_protocol_snapshot().await;
        self.protocol_cache.put(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "ethereum:0xweth";

    /// Serve `router` on loopback and point a client at its /prices and /gas routes
    async fn stub_market(router: axum::Router) -> MarketClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        MarketClient::with_client(
            client,
            format!("http://{}/prices", addr),
            KEY,
            format!("http://{}/gas", addr),
        )
        .with_protocol_api(format!("http://{}/", addr))
    }

    #[test]
    fn test_fallback_report_values() {
        let report = GasPriceReport::fallback(Utc::now());
        assert_eq!(report.fallback, Some(true));
        assert_eq!(report.eth_price, 2500.0);
        assert_eq!(report.gas_price, GasPrices::default());
        assert_eq!(report.estimates.stake.usd, 11.25);

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["gasPrice"]["standard"], 30.0);
        assert_eq!(body["ethPrice"], 2500.0);
        assert_eq!(body["fallback"], true);
    }

    #[test]
    fn test_live_report_omits_fallback_flag() {
        let report = GasPriceReport::live(GasPrices::default(), 3000.0, Utc::now());
        let body = serde_json::to_value(&report).unwrap();
        assert!(body.get("fallback").is_none());
        assert_eq!(body["estimates"]["stake"]["usd"], 13.5);
    }

    #[test]
    fn test_parse_gas_oracle_fields() {
        let prices = parse_gas_oracle(&json!({
            "SafeGasPrice": "12",
            "ProposeGasPrice": "not a number",
            "FastGasPrice": 20.5
        }));
        assert_eq!(prices.slow, 12.0);
        assert_eq!(prices.standard, 30.0);
        assert_eq!(prices.fast, 20.5);
    }

    #[tokio::test]
    async fn test_report_from_live_sources() {
        let router = axum::Router::new()
            .route("/prices", get(|| async { Json(json!({ "coins": { KEY: { "price": 3000.0 } } })) }))
            .route(
                "/gas",
                get(|| async {
                    Json(json!({ "status": "1", "result": {
                        "SafeGasPrice": "10", "ProposeGasPrice": "20", "FastGasPrice": "30"
                    }}))
                }),
            );
        let market = stub_market(router).await;

        let report = market.fetch_report().await;
        assert_eq!(report.fallback, None);
        assert_eq!(report.eth_price, 3000.0);
        assert_eq!(report.gas_price.standard, 20.0);
        // 150_000 gas * 20 gwei = 0.003 ETH = $9
        assert_eq!(report.estimates.stake.eth, 0.003);
        assert_eq!(report.estimates.stake.usd, 9.0);
    }

    #[tokio::test]
    async fn test_gas_oracle_failure_keeps_default_tiers() {
        let router = axum::Router::new()
            .route("/prices", get(|| async { Json(json!({ "coins": {} })) }))
            .route("/gas", get(|| async { Json(json!({ "status": "0", "result": "Invalid API Key" })) }));
        let market = stub_market(router).await;

        let report = market.fetch_report().await;
        assert_eq!(report.fallback, None);
        assert_eq!(report.eth_price, FALLBACK_ETH_PRICE_USD);
        assert_eq!(report.gas_price, GasPrices::default());
    }

    #[tokio::test]
    async fn test_price_failure_returns_fallback_report() {
        let router = axum::Router::new().route("/prices", get(|| async { StatusCode::BAD_GATEWAY }));
        let market = stub_market(router).await;

        assert!(market.fetch_eth_price().await.is_err());
        assert_eq!(market.fetch_report().await.fallback, Some(true));
    }

    #[tokio::test]
    async fn test_report_is_cached_within_ttl() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = axum::Router::new().route(
            "/prices",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "coins": { KEY: { "price": 2000.0 } } }))
                }
            }),
        );
        let market = stub_market(router).await;

        let first = market.gas_report().await;
        let second = market.gas_report().await;
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let market = market.with_ttl(Duration::ZERO);
        market.gas_report().await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_protocol_tvl_shapes() {
        assert_eq!(parse_protocol_tvl(&json!(3.1e9)), Some(3.1e9));
        assert_eq!(parse_protocol_tvl(&json!("2500000")), Some(2_500_000.0));
        assert_eq!(
            parse_protocol_tvl(&json!([
                { "date": 1, "totalLiquidityUSD": 1.0e9 },
                { "date": 2, "totalLiquidityUSD": 1.5e9 }
            ])),
            Some(1.5e9)
        );
        assert_eq!(parse_protocol_tvl(&json!([])), None);
        assert_eq!(parse_protocol_tvl(&json!("n/a")), None);
    }

    #[test]
    fn test_detail_without_tvl_is_ignored() {
        assert!(parse_protocol_detail(&json!({ "name": "ether.fi" }), Utc::now()).is_none());

        let snapshot = parse_protocol_detail(
            &json!({ "name": "ether.fi Stake", "tvl": 4.0e9, "metrics": { "fees24h": "110000", "revenue24h": null } }),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(snapshot.name, "ether.fi Stake");
        assert_eq!(snapshot.tvl, Some(4.0e9));
        assert_eq!(snapshot.fees_24h, Some(110_000.0));
        assert_eq!(snapshot.revenue_24h, None);
    }

    #[test]
    fn test_find_protocol_slug_by_name_or_slug() {
        let list = vec![
            json!({ "name": "Lido", "slug": "lido" }),
            json!({ "name": "Ether.fi Liquid", "slug": "ether.fi-liquid" }),
        ];
        assert_eq!(find_protocol_slug(&list).as_deref(), Some("ether.fi-liquid"));

        let list = vec![json!({ "name": "EFI", "slug": "ether-fi" })];
        assert_eq!(find_protocol_slug(&list).as_deref(), Some("ether-fi"));

        assert!(find_protocol_slug(&[json!({ "name": "Lido", "slug": "lido" })]).is_none());
    }

    #[test]
    fn test_fallback_snapshot_figures() {
        let body = serde_json::to_value(ProtocolSnapshot::fallback(Utc::now())).unwrap();
        assert_eq!(body["tvl"], 3.2e9);
        assert_eq!(body["fees24h"], 120_000.0);
        assert_eq!(body["revenue24h"], 95_000.0);
        assert_eq!(body["fallback"], true);
    }

    #[tokio::test]
    async fn test_protocol_found_through_list_search() {
        let router = axum::Router::new()
            .route(
                "/protocols",
                get(|| async { Json(json!([{ "name": "Lido", "slug": "lido" }, { "name": "ether.fi", "slug": "ether.fi-stake" }])) }),
            )
            .route(
                "/protocol/{slug}",
                get(|Path(slug): Path<String>| async move {
                    Json(json!({ "name": slug, "tvl": 6.0e9, "metrics": { "fees24h": 200000, "revenue24h": 150000 } }))
                }),
            );
        let market = stub_market(router).await;

        let snapshot = market.fetch_protocol_snapshot().await;
        assert_eq!(snapshot.fallback, None);
        assert_eq!(snapshot.name, "ether.fi-stake");
        assert_eq!(snapshot.tvl, Some(6.0e9));
        assert_eq!(snapshot.revenue_24h, Some(150_000.0));
    }

    #[tokio::test]
    async fn test_protocol_falls_back_to_known_slugs() {
        // List endpoint fails, first slug is missing, second answers
        let router = axum::Router::new()
            .route("/protocols", get(|| async { StatusCode::BAD_GATEWAY }))
            .route(
                "/protocol/{slug}",
                get(|Path(slug): Path<String>| async move {
                    if slug == "ether-fi" {
                        Json(json!({ "name": "ether.fi", "tvl": "5000000000" })).into_response()
                    } else {
                        StatusCode::NOT_FOUND.into_response()
                    }
                }),
            );
        let market = stub_market(router).await;

        let snapshot = market.fetch_protocol_snapshot().await;
        assert_eq!(snapshot.tvl, Some(5.0e9));
        assert_eq!(snapshot.fees_24h, None);
        assert_eq!(snapshot.fallback, None);
    }

    #[tokio::test]
    async fn test_protocol_missing_uses_demo_figures() {
        let market = stub_market(axum::Router::new()).await;

        let snapshot = market.protocol_snapshot().await;
        assert_eq!(snapshot.fallback, Some(true));
        assert_eq!(snapshot.tvl, Some(constants::FALLBACK_PROTOCOL_TVL));
    }
}
