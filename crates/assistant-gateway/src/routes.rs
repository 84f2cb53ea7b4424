//! HTTP routes
//!
//! `POST /api/ai` runs the chat pipeline. The `/api/calc/*` routes expose the
//! calculator over query strings, and `/api/defi/*` serves cached market data.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use staking_calc::loyalty::{DEMO_POINTS_PER_TOKEN, DEMO_TOKEN_PRICE_USD};
use staking_calc::restaking::{DEFAULT_SELECTION, find_protocol};
use staking_calc::{
    BASE_STAKING_APR, CalcError, DEFAULT_TIERS, DEMO_OPERATORS, HealthInputs, HealthReport, NodeOperator,
    OperatorSummary, PointsProjection, RestakingProjection, RestakingProtocol, RewardBreakdown, StakeAllocation,
    assess_health, check_amount, compute_points_projection, compute_reward_breakdown, distribute_stake,
    extra_aprs_for, project_restaking, summarize_operators, tier_for, unique_selection,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::gateway::{Gateway, resolve_client_identifier};
use crate::market::MarketClient;
use crate::upstream::Generator;

/// Shared state behind every route
pub struct AppState<G: Generator> {
    pub gateway: Gateway<G>,
    pub market: MarketClient,
}

/// Build the API router
pub fn router<G: Generator>(state: Arc<AppState<G>>, cors: Option<CorsLayer>) -> Router {
    let router = Router::new()
        .route("/api/ai", post(chat::<G>))
        .route("/api/calc/rewards", get(rewards))
        .route("/api/calc/points", get(points))
        .route("/api/calc/restaking", get(restaking))
        .route("/api/calc/health", get(health_score))
        .route("/api/calc/operators", get(operators))
        .route("/api/defi/gas-prices", get(gas_prices::<G>))
        .route("/api/defi/protocol", get(protocol::<G>))
        .route("/api/health", get(health))
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS layer for the configured origins, or `None` for same-origin only
pub fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {}", origin)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Serialize)]
struct ChatReply {
    response: String,
}

async fn chat<G: Generator>(State(state): State<Arc<AppState<G>>>, headers: HeaderMap, body: Bytes) -> Response {
    let client_id = resolve_client_identifier(&headers);

    match state.gateway.handle_chat_request(&client_id, &body).await {
        Ok(response) => {
            info!("answered chat request from {}", client_id);
            Json(ChatReply { response }).into_response()
        }
        Err(e) => {
            debug!("chat request from {} failed: {}", client_id, e);
            e.into_response()
        }
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// 400 with an `error` field
#[derive(Debug)]
struct BadRequest(String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

impl From<CalcError> for BadRequest {
    fn from(e: CalcError) -> Self {
        BadRequest(e.to_string())
    }
}

impl From<QueryRejection> for BadRequest {
    fn from(e: QueryRejection) -> Self {
        BadRequest(e.body_text())
    }
}

#[derive(Deserialize)]
struct RewardsQuery {
    principal: f64,
    apr: f64,
    price: Option<f64>,
}

#[derive(Serialize)]
struct RewardsResponse {
    #[serde(flatten)]
    breakdown: RewardBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    fiat: Option<RewardBreakdown>,
}

async fn rewards(
    query: std::result::Result<Query<RewardsQuery>, QueryRejection>,
) -> std::result::Result<Json<RewardsResponse>, BadRequest> {
    let Query(q) = query?;
    let principal = check_amount("principal", q.principal)?;
    let apr = check_amount("apr", q.apr)?;
    let price = q.price.map(|p| check_amount("price", p)).transpose()?;

    let breakdown = compute_reward_breakdown(principal, apr);
    Ok(Json(RewardsResponse {
        breakdown,
        fiat: price.map(|p| breakdown.in_fiat(p)),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsQuery {
    principal: f64,
    days: u32,
    #[serde(alias = "current_points")]
    current_points: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointsResponse {
    tier: Option<&'static str>,
    #[serde(flatten)]
    projection: PointsProjection,
    hypothetical_value: f64,
}

async fn points(
    query: std::result::Result<Query<PointsQuery>, QueryRejection>,
) -> std::result::Result<Json<PointsResponse>, BadRequest> {
    let Query(q) = query?;
    let principal = check_amount("principal", q.principal)?;
    let current_points = check_amount("current_points", q.current_points.unwrap_or(0.0))?;

    let projection = compute_points_projection(current_points, principal, q.days, DEFAULT_TIERS);
    Ok(Json(PointsResponse {
        tier: tier_for(q.days, DEFAULT_TIERS).map(|t| t.name),
        hypothetical_value: projection.hypothetical_value(DEMO_POINTS_PER_TOKEN, DEMO_TOKEN_PRICE_USD),
        projection,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestakingQuery {
    principal: f64,
    #[serde(alias = "base_apr")]
    base_apr: Option<f64>,
    /// Comma-separated protocol ids
    protocols: Option<String>,
}

#[derive(Serialize)]
struct RestakingResponse {
    protocols: Vec<&'static RestakingProtocol>,
    #[serde(flatten)]
    projection: RestakingProjection,
}

/// Parse "1, 3" into known protocol ids. Repeats are dropped, first-seen order kept.
fn parse_protocol_ids(list: &str) -> std::result::Result<Vec<u32>, BadRequest> {
    let ids = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .ok()
                .filter(|id| find_protocol(*id).is_some())
                .ok_or_else(|| BadRequest(format!("unknown protocol id: {}", s)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(unique_selection(&ids))
}

async fn restaking(
    query: std::result::Result<Query<RestakingQuery>, QueryRejection>,
) -> std::result::Result<Json<RestakingResponse>, BadRequest> {
    let Query(q) = query?;
    let principal = check_amount("principal", q.principal)?;
    let base_apr = check_amount("base_apr", q.base_apr.unwrap_or(BASE_STAKING_APR))?;
    let ids = match q.protocols.as_deref() {
        Some(list) => parse_protocol_ids(list)?,
        None => DEFAULT_SELECTION.to_vec(),
    };

    Ok(Json(RestakingResponse {
        protocols: ids.iter().filter_map(|id| find_protocol(*id)).collect(),
        projection: project_restaking(principal, base_apr, &extra_aprs_for(&ids)),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthQuery {
    #[serde(alias = "eth_price")]
    eth_price: f64,
    #[serde(alias = "eeth_price")]
    eeth_price: Option<f64>,
    tvl: f64,
    #[serde(alias = "max_capacity")]
    max_capacity: Option<f64>,
    #[serde(alias = "total_validators")]
    total_validators: Option<u32>,
    #[serde(alias = "active_validators")]
    active_validators: Option<u32>,
}

async fn health_score(
    query: std::result::Result<Query<HealthQuery>, QueryRejection>,
) -> std::result::Result<Json<HealthReport>, BadRequest> {
    let Query(q) = query?;
    let inputs = HealthInputs {
        eth_price: check_amount("eth_price", q.eth_price)?,
        eeth_price: q.eeth_price.map(|p| check_amount("eeth_price", p)).transpose()?,
        tvl: check_amount("tvl", q.tvl)?,
        max_capacity: q.max_capacity.map(|c| check_amount("max_capacity", c)).transpose()?,
        total_validators: q.total_validators,
        active_validators: q.active_validators,
    };

    Ok(Json(assess_health(&inputs)))
}

#[derive(Deserialize)]
struct OperatorsQuery {
    stake: f64,
}

#[derive(Serialize)]
struct OperatorsResponse {
    operators: &'static [NodeOperator],
    distribution: Vec<StakeAllocation>,
    summary: OperatorSummary,
}

async fn operators(
    query: std::result::Result<Query<OperatorsQuery>, QueryRejection>,
) -> std::result::Result<Json<OperatorsResponse>, BadRequest> {
    let Query(q) = query?;
    let stake = check_amount("stake", q.stake)?;

    Ok(Json(OperatorsResponse {
        operators: DEMO_OPERATORS,
        distribution: distribute_stake(stake, DEMO_OPERATORS),
        summary: summarize_operators(DEMO_OPERATORS),
    }))
}

// =============================================================================
// Market data and health
// =============================================================================

async fn gas_prices<G: Generator>(State(state): State<Arc<AppState<G>>>) -> Response {
    Json(state.market.gas_report().await).into_response()
}

async fn protocol<G: Generator>(State(state): State<Arc<AppState<G>>>) -> Response {
    Json(state.market.protocol_snapshot().await).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use crate::gateway::tests::{Behavior, StubGenerator, gateway};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Market client pointed at a closed loopback port, so every lookup fails fast
    fn offline_market() -> MarketClient {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        MarketClient::with_client(client, "http://127.0.0.1:1/prices", "k", "http://127.0.0.1:1/gas")
            .with_protocol_api("http://127.0.0.1:1")
    }

    fn app(behavior: Behavior) -> Router {
        let state = Arc::new(AppState {
            gateway: gateway(behavior),
            market: offline_market(),
        });
        router(state, None)
    }

    fn chat_request(client: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ai")
            .header("content-type", "application/json")
            .header("x-forwarded-for", client)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_success() {
        let app = app(Behavior::Reply("Staking earns about 3.5% APR."));
        let (status, body) = send(&app, chat_request("1.2.3.4", r#"{"message":"How much can I earn?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Staking earns about 3.5% APR.");
    }

    #[tokio::test]
    async fn test_chat_validation_errors() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(&app, chat_request("a", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], constants::MSG_INVALID_FORMAT);

        let (status, body) = send(&app, chat_request("a", r#"{"message":42}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], constants::MSG_INVALID_FORMAT);

        let long = json!({ "message": "x".repeat(1001) }).to_string();
        let (status, body) = send(&app, chat_request("a", &long)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message too long. Maximum 1000 characters.");

        let (status, body) = send(&app, chat_request("a", r#"{"message":"<b></b>"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], constants::MSG_INVALID_CONTENT);
    }

    #[tokio::test]
    async fn test_chat_rate_limit_per_forwarded_client() {
        let app = app(Behavior::Reply("ok"));
        let body = r#"{"message":"hi"}"#;

        for _ in 0..constants::RATE_LIMIT {
            let (status, _) = send(&app, chat_request("9.9.9.9", body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, reply) = send(&app, chat_request("9.9.9.9", body)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(reply["error"], constants::MSG_RATE_LIMITED);

        let (status, _) = send(&app, chat_request("8.8.8.8", body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_returns_setup_help() {
        let app = app(Behavior::Fail);
        let (status, body) = send(&app, chat_request("a", r#"{"message":"hi"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["response"].as_str().unwrap().contains("ollama pull stub-model"));
        assert!(body.get("error").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_timeout_returns_504() {
        let app = app(Behavior::Hang);
        let (status, body) = send(&app, chat_request("a", r#"{"message":"hi"}"#)).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["response"], constants::MSG_TIMEOUT);
    }

    #[tokio::test]
    async fn test_chat_misconfigured_upstream() {
        let state = Arc::new(AppState {
            gateway: Gateway::new(
                StubGenerator::new(Behavior::Reply("ok")),
                Default::default(),
                "http://ollama.internal:11434/api/generate",
                Duration::from_secs(30),
            ),
            market: offline_market(),
        });
        let app = router(state, None);

        let (status, body) = send(&app, chat_request("a", r#"{"message":"hi"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["response"], constants::MSG_MISCONFIGURED);
    }

    #[tokio::test]
    async fn test_rewards_endpoint() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/calc/rewards?principal=10&apr=3.65&price=2000")).await;

        assert_eq!(status, StatusCode::OK);
        assert!((body["perYear"].as_f64().unwrap() - 0.365).abs() < 1e-12);
        assert!((body["perDay"].as_f64().unwrap() - 0.001).abs() < 1e-12);
        assert!((body["fiat"]["perYear"].as_f64().unwrap() - 730.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rewards_rejects_bad_input() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(&app, get_request("/api/calc/rewards?principal=-1&apr=3.5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("principal"));

        let (status, _) = send(&app, get_request("/api/calc/rewards?principal=abc&apr=3.5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get_request("/api/calc/rewards?principal=NaN&apr=3.5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_points_endpoint() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/calc/points?principal=10&days=30&currentPoints=1234")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "Silver");
        assert_eq!(body["multiplier"], 1.2);
        assert!((body["projectedTotal"].as_f64().unwrap() - 1594.0).abs() < 1e-9);
        assert!((body["hypotheticalValue"].as_f64().unwrap() - 3985.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restaking_endpoint() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(&app, get_request("/api/calc/restaking?principal=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["protocols"].as_array().unwrap().len(), 2);
        assert!((body["totalApr"].as_f64().unwrap() - 9.2).abs() < 1e-9);

        let (status, body) = send(&app, get_request("/api/calc/restaking?principal=10&protocols=4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["protocols"][0]["name"], "ZK-Prover");
        assert!((body["totalApr"].as_f64().unwrap() - 8.5).abs() < 1e-9);

        let (status, body) = send(&app, get_request("/api/calc/restaking?principal=10&protocols=1,9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown protocol id: 9");
    }

    #[tokio::test]
    async fn test_restaking_repeated_ids_count_once() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(&app, get_request("/api/calc/restaking?principal=10&protocols=4,4,4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["protocols"].as_array().unwrap().len(), 1);
        assert!((body["restakingApr"].as_f64().unwrap() - 5.0).abs() < 1e-9);
        assert!((body["totalApr"].as_f64().unwrap() - 8.5).abs() < 1e-9);

        let (_, body) = send(&app, get_request("/api/calc/restaking?principal=10&protocols=2,1,2")).await;
        assert_eq!(body["protocols"][0]["name"], "OracleNet");
        assert_eq!(body["protocols"][1]["name"], "DataLayer");
        assert!((body["totalApr"].as_f64().unwrap() - 9.2).abs() < 1e-9);
    }

    #[test]
    fn test_parse_protocol_ids_rejects_bad_entries() {
        assert_eq!(parse_protocol_ids(" 3, ,1,3 ").unwrap(), vec![3, 1]);
        assert!(parse_protocol_ids("1,x").is_err());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(
            &app,
            get_request("/api/calc/health?ethPrice=2500&eethPrice=2490&tvl=90&maxCapacity=100&totalValidators=68&activeValidators=61"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pegStatus"], "warning");
        assert_eq!(body["capacityStatus"], "warning");
        assert_eq!(body["validatorStatus"], "critical");
        assert_eq!(body["score"], 45);
        assert_eq!(body["label"], "Critical");

        let (status, body) = send(&app, get_request("/api/calc/health?eth_price=2500&tvl=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 100);
        assert_eq!(body["label"], "Excellent");

        let (status, _) = send(&app, get_request("/api/calc/health?ethPrice=-1&tvl=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_operators_endpoint() {
        let app = app(Behavior::Reply("ok"));

        let (status, body) = send(&app, get_request("/api/calc/operators?stake=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operators"].as_array().unwrap().len(), 8);
        assert_eq!(body["distribution"].as_array().unwrap().len(), 7);
        assert_eq!(body["distribution"][0]["amount"], 1.4286);
        assert_eq!(body["summary"]["activeValidators"], 61);

        let (status, _) = send(&app, get_request("/api/calc/operators?stake=-2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protocol_falls_back_when_offline() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/defi/protocol")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fallback"], true);
        assert_eq!(body["tvl"], 3.2e9);
        assert_eq!(body["fees24h"], 120_000.0);
    }

    #[tokio::test]
    async fn test_restaking_unknown_id_rejected() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/calc/restaking?principal=10&protocols=1,9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown protocol id: 9");
    }

    #[tokio::test]
    async fn test_gas_prices_fall_back_when_offline() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/defi/gas-prices")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["fallback"], true);
        assert_eq!(body["ethPrice"], 2500.0);
        assert_eq!(body["gasPrice"]["fast"], 40.0);
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Behavior::Reply("ok"));
        let (status, body) = send(&app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_cors_layer_from_origins() {
        assert!(cors_layer(&[]).unwrap().is_none());
        assert!(cors_layer(&["http://localhost:5173".to_string()]).unwrap().is_some());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
