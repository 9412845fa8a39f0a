//! HTTP front door: an axum router over the fee engine and the
//! administrative services, plus the periodic weather collection task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use courier_core::repository::memory::{MemoryRegionalFees, MemoryWeatherData, MemoryWeatherFees};
use courier_core::{
    feed, seed, Category, City, Condition, Config, Error, FeeEngine, FeedClient, RegionalFee,
    RegionalFeeService, RuleDraft, RuleService, Vehicle, WeatherFeeRule,
};

struct AppState {
    engine: FeeEngine,
    rules: RuleService,
    regional: RegionalFeeService,
}

pub async fn serve(config: Config, bind_override: Option<String>) -> anyhow::Result<()> {
    let regional = Arc::new(MemoryRegionalFees::default());
    let rules = Arc::new(MemoryWeatherFees::default());
    let weather = Arc::new(MemoryWeatherData::default());
    seed::seed_defaults(regional.as_ref(), rules.as_ref()).await?;

    let state = Arc::new(AppState {
        engine: FeeEngine::new(regional.clone(), rules.clone(), weather.clone()),
        rules: RuleService::new(rules),
        regional: RegionalFeeService::new(regional),
    });

    let client = FeedClient::new(config.feed.url.clone());
    let period = Duration::from_secs(config.feed.interval_secs.max(1));
    tokio::spawn(collect_periodically(client, weather, period));

    let bind = bind_override.unwrap_or(config.server.bind);
    let addr: SocketAddr =
        bind.parse().with_context(|| format!("Invalid bind address: {bind}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Run the feed collector forever; the first tick fires immediately so the
/// server starts with fresh observations. A failed run only logs, and the
/// next tick retries.
async fn collect_periodically(
    client: FeedClient,
    weather: Arc<MemoryWeatherData>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(err) = feed::collect(&client, weather.as_ref()).await {
            error!("weather collection failed: {err:#}");
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/delivery/:city", get(get_delivery_fee))
        .route("/api/weather-fees", get(list_rules).post(create_rule))
        .route(
            "/api/weather-fees/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/regional-fees", get(list_regional_fees).post(create_regional_fee))
        .route(
            "/api/regional-fees/:city/:vehicle",
            get(get_regional_fee).put(update_regional_fee).delete(delete_regional_fee),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

/// Error envelope returned by every endpoint: a stable message per error
/// kind plus the specific detail line.
struct ApiError {
    status: StatusCode,
    message: &'static str,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl ToString) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: "Resource not found", detail: detail.to_string() }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, message) = match &err {
            Error::Unavailable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Vehicle is unavailable in the specified city")
            }
            Error::Forbidden { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Usage of selected vehicle type is forbidden")
            }
            Error::Conflict(_) => (StatusCode::CONFLICT, "Rule conflicts with an existing rule"),
            Error::InvalidRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Constraint violation"),
            Error::RuleNotFound { .. } | Error::RegionalFeeNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Resource not found")
            }
            Error::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable"),
        };
        Self { status, message, detail: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": self.status.as_u16(),
            "message": self.message,
            "details": [self.detail],
        });
        (self.status, Json(body)).into_response()
    }
}

/// Flat wire shape of a stored rule, mirroring the draft plus its id.
#[derive(Debug, Serialize)]
struct RuleBody {
    id: u64,
    vehicle: Vehicle,
    category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    above: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    below: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phenomenon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee: Option<f64>,
}

impl From<WeatherFeeRule> for RuleBody {
    fn from(rule: WeatherFeeRule) -> Self {
        let category = rule.category();
        let (above, below, phenomenon) = match rule.condition {
            Condition::AirTemperature(range) | Condition::WindSpeed(range) => {
                (range.above, range.below, None)
            }
            Condition::Phenomenon(text) => (None, None, Some(text)),
        };
        Self { id: rule.id, vehicle: rule.vehicle, category, above, below, phenomenon, fee: rule.fee }
    }
}

#[derive(Debug, Deserialize)]
struct DeliveryParams {
    vehicle: String,
}

async fn get_delivery_fee(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
    Query(params): Query<DeliveryParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let city = City::try_from(city.as_str()).map_err(ApiError::not_found)?;
    let vehicle = Vehicle::try_from(params.vehicle.as_str()).map_err(ApiError::not_found)?;

    let quote = state.engine.quote(city, vehicle).await?;
    Ok(Json(json!({
        "city": quote.city,
        "vehicle": quote.vehicle,
        "fee": quote.total,
    })))
}

async fn list_rules(State(state): State<Arc<AppState>>) -> Result<Json<Vec<RuleBody>>, ApiError> {
    let rules = state.rules.list().await?;
    Ok(Json(rules.into_iter().map(RuleBody::from).collect()))
}

async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<RuleBody>, ApiError> {
    Ok(Json(state.rules.get(id).await?.into()))
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RuleDraft>,
) -> Result<(StatusCode, Json<RuleBody>), ApiError> {
    let rule = state.rules.create(draft).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(draft): Json<RuleDraft>,
) -> Result<Json<RuleBody>, ApiError> {
    Ok(Json(state.rules.update(id, draft).await?.into()))
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.rules.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_regional_fees(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RegionalFee>>, ApiError> {
    Ok(Json(state.regional.list().await?))
}

async fn get_regional_fee(
    State(state): State<Arc<AppState>>,
    Path((city, vehicle)): Path<(String, String)>,
) -> Result<Json<RegionalFee>, ApiError> {
    let (city, vehicle) = parse_key(&city, &vehicle)?;
    Ok(Json(state.regional.get(city, vehicle).await?))
}

async fn create_regional_fee(
    State(state): State<Arc<AppState>>,
    Json(fee): Json<RegionalFee>,
) -> Result<(StatusCode, Json<RegionalFee>), ApiError> {
    let created = state.regional.create(fee).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_regional_fee(
    State(state): State<Arc<AppState>>,
    Path((city, vehicle)): Path<(String, String)>,
    Json(fee): Json<RegionalFee>,
) -> Result<Json<RegionalFee>, ApiError> {
    let (city, vehicle) = parse_key(&city, &vehicle)?;
    Ok(Json(state.regional.update(city, vehicle, fee).await?))
}

async fn delete_regional_fee(
    State(state): State<Arc<AppState>>,
    Path((city, vehicle)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (city, vehicle) = parse_key(&city, &vehicle)?;
    state.regional.delete(city, vehicle).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_key(city: &str, vehicle: &str) -> Result<(City, Vehicle), ApiError> {
    let city = City::try_from(city).map_err(ApiError::not_found)?;
    let vehicle = Vehicle::try_from(vehicle).map_err(ApiError::not_found)?;
    Ok((city, vehicle))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
