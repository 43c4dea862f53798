//! REST API for the haulage engine.
//!
//! Exposes load assessment, journey quotes, trailer allocation and override
//! administration as JSON endpoints. Uses Axum as the web framework and
//! supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::allocator::{
    AllocationCheck, AllocationResult, AllocatorConfig, allocate_with_config,
    allocate_with_progress, can_allocate,
};
use crate::classifier::assess_load;
use crate::config::ApiConfig;
use crate::geometry::{LayoutConflict, layout_conflicts};
use crate::model::{
    LoadAssessment, LoadDimensions, PalletItem, PlotAllocation, PlotPosition, PlotSpecification,
    TrailerCapacity, ValidationError,
};
use crate::rates::{
    DistanceTier, DistanceTierOverride, JourneyQuote, OverrideSet, PlotOverride, WeightRatioTier,
    WeightRatioTierOverride, quote_journey,
};
use crate::store::{OverrideService, StoreError, StoreTier, WriteOutcome};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct ApiState {
    overrides: Arc<OverrideService>,
    allocator: AllocatorConfig,
}

impl ApiState {
    pub fn new(overrides: Arc<OverrideService>, allocator: AllocatorConfig) -> Self {
        Self {
            overrides,
            allocator,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>haulage-engine API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Assessment with the tier the rates were read from.
#[derive(Serialize, ToSchema)]
pub struct AssessResponse {
    #[serde(flatten)]
    pub assessment: LoadAssessment,
    pub rates_source: StoreTier,
}

/// Request for a distance- and weight-scaled price.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "load": { "length_mm": 1200.0, "width_mm": 1000.0, "height_mm": 1100.0, "weight_kg": 450.0 },
        "distance_miles": 120.0,
        "pallets": 2,
        "weight_ratio": 0.9
    })
)]
pub struct QuoteRequest {
    pub load: LoadDimensions,
    pub distance_miles: f64,
    #[serde(default = "default_pallets")]
    pub pallets: u32,
    #[serde(default = "default_weight_ratio")]
    pub weight_ratio: f64,
}

fn default_pallets() -> u32 {
    1
}

fn default_weight_ratio() -> f64 {
    1.0
}

#[derive(Serialize, ToSchema)]
pub struct QuoteResponse {
    pub assessment: LoadAssessment,
    pub quote: JourneyQuote,
    pub rates_source: StoreTier,
}

/// Request for an allocation run or a capacity pre-check.
#[derive(Deserialize, ToSchema)]
pub struct AllocateRequest {
    pub items: Vec<PalletItem>,
    pub capacity: TrailerCapacity,
    /// Plots already on the trailer from earlier runs.
    #[serde(default)]
    pub existing: Vec<PlotAllocation>,
}

impl AllocateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.capacity.validate()?;
        for item in &self.items {
            item.validate()?;
        }
        for allocation in &self.existing {
            allocation.validate()?;
        }
        Ok(())
    }
}

/// Item the allocator did not place.
#[derive(Serialize, ToSchema)]
pub struct RejectedEntry {
    pub item: PalletItem,
    pub reason_code: String,
    pub reason: String,
}

/// Allocation outcome with layout diagnostics.
#[derive(Serialize, ToSchema)]
pub struct AllocateResponse {
    pub accepted: Vec<PlotAllocation>,
    pub rejected: Vec<RejectedEntry>,
    /// Code of the limit that stopped the run, if any.
    pub halted_by: Option<String>,
    pub is_complete: bool,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    /// Overlapping plots in the combined existing and new layout.
    pub conflicts: Vec<LayoutConflict>,
}

impl AllocateResponse {
    fn from_result(result: AllocationResult, existing: &[PlotAllocation]) -> Self {
        let is_complete = result.is_complete();
        let total_weight_kg = result.total_weight_kg();
        let total_volume_m3 = result.total_volume_m3();

        let mut layout = existing.to_vec();
        layout.extend(result.accepted.iter().cloned());
        let conflicts = layout_conflicts(&layout);

        Self {
            accepted: result.accepted,
            rejected: result
                .rejected
                .into_iter()
                .map(|entry| RejectedEntry {
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                    item: entry.item,
                })
                .collect(),
            halted_by: result.halted_by.map(|reason| reason.code().to_string()),
            is_complete,
            total_weight_kg,
            total_volume_m3,
            conflicts,
        }
    }
}

/// Effective rate tables with the raw overrides behind them.
#[derive(Serialize, ToSchema)]
pub struct RatesResponse {
    pub plots: Vec<PlotSpecification>,
    pub distance_tiers: Vec<DistanceTier>,
    pub weight_ratio_tiers: Vec<WeightRatioTier>,
    pub overrides: OverrideSet,
    /// Override keys that match no default entry and have no effect.
    pub inert_overrides: Vec<String>,
    pub source: StoreTier,
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "plot_overrides": [{ "name": "Full Plot", "base_cost_gbp": "60.00" }],
        "distance_tier_overrides": [],
        "weight_ratio_tier_overrides": [{ "tier": 1, "multiplier": "0.90" }],
        "updated_by": "ops@example.com"
    })
)]
pub struct UpdateOverridesRequest {
    #[serde(flatten)]
    pub overrides: OverrideSet,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn store_error(err: StoreError) -> Response {
    error!(error = %err, "Override store write failed");
    let status = match err {
        StoreError::BothTiersFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, "Override store unavailable", err.to_string())
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(json_deserialize_error)
}

fn parse_allocate_request(
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Result<AllocateRequest, Response> {
    let request = parse_json(payload)?;
    request.validate().map_err(validation_error)?;
    Ok(request)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_assess,
        handle_quote,
        handle_allocate,
        handle_allocate_check,
        handle_allocate_stream,
        handle_get_rates,
        handle_put_overrides,
        handle_delete_overrides
    ),
    components(
        schemas(
            LoadDimensions,
            LoadAssessment,
            AssessResponse,
            QuoteRequest,
            QuoteResponse,
            JourneyQuote,
            AllocateRequest,
            AllocateResponse,
            RejectedEntry,
            AllocationCheck,
            PalletItem,
            TrailerCapacity,
            PlotAllocation,
            PlotPosition,
            LayoutConflict,
            RatesResponse,
            PlotSpecification,
            DistanceTier,
            WeightRatioTier,
            OverrideSet,
            PlotOverride,
            DistanceTierOverride,
            WeightRatioTierOverride,
            UpdateOverridesRequest,
            WriteOutcome,
            StoreTier,
            ErrorResponse
        )
    ),
    tags(
        (name = "pricing", description = "Load classification and pricing"),
        (name = "allocation", description = "Trailer allocation"),
        (name = "rates", description = "Rate tables and administrator overrides")
    )
)]
struct ApiDoc;

/// Builds the router with all endpoints.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/assess", post(handle_assess))
        .route("/quote", post(handle_quote))
        .route("/allocate", post(handle_allocate))
        .route("/allocate/check", post(handle_allocate_check))
        .route("/allocate_stream", post(handle_allocate_stream))
        .route("/rates", get(handle_get_rates))
        .route(
            "/rates/overrides",
            put(handle_put_overrides).delete(handle_delete_overrides),
        )
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, state: ApiState) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!(
        "Endpoints: POST /assess, POST /quote, POST /allocate, POST /allocate/check, \
         POST /allocate_stream, GET /rates, PUT|DELETE /rates/overrides, GET /docs"
    );

    axum::serve(listener, router(state)).await
}

/// Handler for POST /assess.
///
/// Classifies a load against the current plot table and prices it.
#[utoipa::path(
    post,
    path = "/assess",
    request_body = LoadDimensions,
    responses(
        (status = 200, description = "Load classified and priced", body = AssessResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid load", body = ErrorResponse)
    ),
    tag = "pricing"
)]
async fn handle_assess(
    State(state): State<ApiState>,
    payload: Result<Json<LoadDimensions>, JsonRejection>,
) -> Response {
    let load = match parse_json(payload) {
        Ok(load) => load,
        Err(response) => return response,
    };
    if let Err(err) = load.validate() {
        return validation_error(err);
    }

    let served = state.overrides.current().await;
    let assessment = assess_load(&load, state.overrides.table(), &served.value);
    info!(
        plot = %assessment.recommended_plot_name,
        total = %assessment.total_cost_gbp,
        oversized = assessment.is_oversized,
        "Assessed load"
    );

    let response = AssessResponse {
        assessment,
        rates_source: served.tier,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /quote.
#[utoipa::path(
    post,
    path = "/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Journey priced", body = QuoteResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid load or journey", body = ErrorResponse)
    ),
    tag = "pricing"
)]
async fn handle_quote(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.load.validate() {
        return validation_error(err);
    }

    let served = state.overrides.current().await;
    let table = state.overrides.table();
    let assessment = assess_load(&request.load, table, &served.value);
    let quote = match quote_journey(
        &assessment,
        request.distance_miles,
        request.pallets,
        request.weight_ratio,
        table,
        &served.value,
    ) {
        Ok(quote) => quote,
        Err(err) => return validation_error(err),
    };
    info!(
        distance_miles = request.distance_miles,
        pallets = request.pallets,
        total = %quote.total_gbp,
        "Quoted journey"
    );

    let response = QuoteResponse {
        assessment,
        quote,
        rates_source: served.tier,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /allocate.
///
/// Places pallet items on a trailer and reports what did not fit.
#[utoipa::path(
    post,
    path = "/allocate",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Allocation finished", body = AllocateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid items or trailer", body = ErrorResponse)
    ),
    tag = "allocation"
)]
async fn handle_allocate(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_allocate_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        items = request.items.len(),
        existing = request.existing.len(),
        "New allocation request"
    );

    let overrides = state.overrides.current().await.value;
    let result = allocate_with_config(
        request.items,
        &request.capacity,
        &request.existing,
        state.overrides.table(),
        &overrides,
        state.allocator,
    );
    info!(
        accepted = result.accepted.len(),
        rejected = result.rejected.len(),
        "Allocation finished"
    );

    let response = AllocateResponse::from_result(result, &request.existing);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /allocate/check.
///
/// Compares total weight and volume against the trailer without placing anything.
#[utoipa::path(
    post,
    path = "/allocate/check",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Capacity check result", body = AllocationCheck),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid items or trailer", body = ErrorResponse)
    ),
    tag = "allocation"
)]
async fn handle_allocate_check(
    State(_state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_allocate_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let check = can_allocate(&request.items, &request.capacity, &request.existing);
    (StatusCode::OK, Json(check)).into_response()
}

/// Handler for POST /allocate_stream (SSE).
///
/// Streams allocation events as Server-Sent Events while the run progresses.
#[utoipa::path(
    post,
    path = "/allocate_stream",
    request_body = AllocateRequest,
    responses(
        (
            status = 200,
            description = "Streams allocation events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid items or trailer", body = ErrorResponse)
    ),
    tag = "allocation"
)]
async fn handle_allocate_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AllocateRequest>, JsonRejection>,
) -> Response {
    let AllocateRequest {
        items,
        capacity,
        existing,
    } = match parse_allocate_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let overrides = state.overrides.current().await.value;
    let table = state.overrides.table().clone();
    let config = state.allocator;
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        allocate_with_progress(
            items,
            &capacity,
            &existing,
            &table,
            &overrides,
            config,
            |evt| {
                if let Ok(json) = serde_json::to_string(evt) {
                    // A closed receiver means the client left; remaining events are dropped.
                    let _ = tx.blocking_send(json);
                }
            },
        );
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /rates.
#[utoipa::path(
    get,
    path = "/rates",
    responses(
        (status = 200, description = "Effective rate tables", body = RatesResponse)
    ),
    tag = "rates"
)]
async fn handle_get_rates(State(state): State<ApiState>) -> Response {
    let served = state.overrides.current().await;
    let table = state.overrides.table();
    let response = RatesResponse {
        plots: table.effective_plots(&served.value),
        distance_tiers: table.effective_distance_tiers(&served.value),
        weight_ratio_tiers: table.effective_weight_ratio_tiers(&served.value),
        inert_overrides: served.value.inert_keys(table),
        overrides: served.value,
        source: served.tier,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for PUT /rates/overrides.
///
/// Replaces the whole override set.
#[utoipa::path(
    put,
    path = "/rates/overrides",
    request_body = UpdateOverridesRequest,
    responses(
        (status = 200, description = "Overrides saved", body = WriteOutcome),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid override values", body = ErrorResponse),
        (status = SERVICE_UNAVAILABLE, description = "No store accepted the write", body = ErrorResponse)
    ),
    tag = "rates"
)]
async fn handle_put_overrides(
    State(state): State<ApiState>,
    payload: Result<Json<UpdateOverridesRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.overrides.validate() {
        return validation_error(err);
    }

    match state
        .overrides
        .save(request.overrides, request.updated_by)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => store_error(err),
    }
}

/// Handler for DELETE /rates/overrides.
///
/// Removes every override so the default tables apply again.
#[utoipa::path(
    delete,
    path = "/rates/overrides",
    responses(
        (status = 200, description = "Overrides cleared", body = WriteOutcome),
        (status = SERVICE_UNAVAILABLE, description = "No store accepted the write", body = ErrorResponse)
    ),
    tag = "rates"
)]
async fn handle_delete_overrides(State(state): State<ApiState>) -> Response {
    match state.overrides.reset_all(None).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => store_error(err),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
