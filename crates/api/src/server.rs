use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use relationnft_core::{
    format_ether, parse_address, parse_ether, Address, Milestone, Relationship, B256, MILESTONES,
    U256,
};
use relationnft_oracle::{
    chain::AlloyChainClient,
    config::Config,
    ledger::Ledger,
    metadata::MetadataTemplate,
    pinning::PinataClient,
    EventReport, MintError, MintOrchestrator, MintStatus, RelationService,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct AppState {
    service: Arc<RelationService>,
}

fn router_for_state(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/milestones", get(get_milestones))
        .route("/api/farcaster/webhook", post(post_webhook))
        .route("/api/relationship/:user1/:user2", get(get_relationship))
        .route("/api/mint", post(post_mint))
        .route("/api/user/:address/stats", get(get_user_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the HTTP router around an existing service.
pub fn build_app(service: RelationService) -> Router {
    router_for_state(AppState {
        service: Arc::new(service),
    })
}

/// Wire the Alloy chain client, the Pinata client and an in-memory ledger
/// from configuration.
pub fn build_service(config: &Config) -> anyhow::Result<RelationService> {
    let chain = AlloyChainClient::from_private_key(
        &config.network.rpc_url,
        &config.oracle_private_key_with_prefix(),
        config.contracts.relation_nft,
    )
    .context("Failed to create chain client")?;

    info!("  Oracle address: {}", chain.oracle_address());
    info!("  RelationNFT contract: {}", chain.contract_address());

    let pinning =
        PinataClient::from_config(&config.pinning).context("Failed to create pinning client")?;

    let orchestrator = MintOrchestrator::new(
        Ledger::in_memory(),
        Arc::new(chain),
        Arc::new(pinning),
        MetadataTemplate::from_config(&config.metadata),
    );

    Ok(RelationService::new(orchestrator))
}

/// Run the API server until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let service = build_service(&config)?;
    info!("Ledger backend: {}", service.ledger().backend_type());
    let app = build_app(service);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("RelationNFT API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("RelationNFT API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

const ERROR_CODE_INVALID_REQUEST: &str = "invalid_request";
const ERROR_CODE_INTERNAL_ERROR: &str = "internal_error";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Debug, Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorInfo {
                code,
                message: message.into(),
            },
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, ERROR_CODE_INVALID_REQUEST, msg)
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ERROR_CODE_INTERNAL_ERROR,
        format!("Internal error: {}", err),
    )
}

fn mint_error(err: MintError) -> ApiError {
    let status = match err {
        MintError::AlreadyMinted(_) => StatusCode::CONFLICT,
        MintError::InvalidMilestone(_) | MintError::MissingRelationship(_) => {
            StatusCode::BAD_REQUEST
        }
        MintError::MetadataUploadFailed(_)
        | MintError::ContractCallFailed(_)
        | MintError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Mint failed: {}", err);
    }
    api_error(status, err.code(), err.to_string())
}

fn parse_address_field(field: &str, value: Option<&str>) -> Result<Address, ApiError> {
    let value = value.ok_or_else(|| bad_request(format!("Missing field: {}", field)))?;
    parse_address(value).map_err(|_| bad_request(format!("Invalid {}: {}", field, value)))
}

/// Decimal ether amount, given as a JSON string or number.
fn parse_amount(value: &Value) -> Result<U256, ApiError> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => expand_exponent(&n.to_string()),
        other => return Err(bad_request(format!("Invalid amount: {}", other))),
    };
    parse_ether(&text).map_err(|e| bad_request(e.to_string()))
}

/// Rewrite exponent notation (`1e-7`, `2.5e3`) as a plain decimal.
fn expand_exponent(number: &str) -> String {
    let Some((mantissa, exponent)) = number.split_once(['e', 'E']) else {
        return number.to_string();
    };
    let Ok(exponent) = exponent.parse::<i64>() else {
        return number.to_string();
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", whole, fraction);
    let point = whole.len() as i64 + exponent;

    let plain = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    };
    format!("{}{}", sign, plain)
}

fn hex_b256(v: &B256) -> String {
    format!("0x{}", hex::encode(v.as_slice()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdJson {
    min_interactions: u64,
    min_tips_eth: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MilestoneJson {
    id: Milestone,
    contract_enum: u8,
    threshold: Option<ThresholdJson>,
}

async fn get_milestones() -> Json<Vec<MilestoneJson>> {
    Json(
        MILESTONES
            .iter()
            .map(|def| MilestoneJson {
                id: def.id,
                contract_enum: def.id.contract_enum(),
                threshold: def.threshold.map(|t| ThresholdJson {
                    min_interactions: t.min_interactions,
                    min_tips_eth: t.min_tips_ether,
                }),
            })
            .collect(),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipJson {
    key: String,
    users: [String; 2],
    interaction_count: u64,
    /// Wei, as a decimal string.
    total_tips_exchanged: String,
    total_tips_eth: String,
    first_interaction: DateTime<Utc>,
    last_interaction: DateTime<Utc>,
    awarded_milestones: Vec<Milestone>,
}

impl From<&Relationship> for RelationshipJson {
    fn from(rel: &Relationship) -> Self {
        Self {
            key: rel.key().to_string(),
            users: [rel.users[0].to_string(), rel.users[1].to_string()],
            interaction_count: rel.interaction_count,
            total_tips_exchanged: rel.total_tips_exchanged.to_string(),
            total_tips_eth: format_ether(rel.total_tips_exchanged),
            first_interaction: rel.first_interaction,
            last_interaction: rel.last_interaction,
            awarded_milestones: rel.awarded_milestones.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WebhookRequest {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookData {
    from_address: Option<String>,
    to_address: Option<String>,
    #[serde(default)]
    amount: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintJson {
    milestone: Milestone,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<String>,
}

#[derive(Serialize)]
struct WebhookResponse {
    success: bool,
    relationship: RelationshipJson,
    mints: Vec<MintJson>,
}

impl From<&EventReport> for WebhookResponse {
    fn from(report: &EventReport) -> Self {
        Self {
            success: true,
            relationship: RelationshipJson::from(&report.relationship),
            mints: report
                .mints
                .iter()
                .map(|mint| match &mint.status {
                    MintStatus::Minted { tx_hash } => MintJson {
                        milestone: mint.milestone,
                        status: "minted",
                        tx_hash: Some(hex_b256(tx_hash)),
                    },
                    MintStatus::AlreadyMinted => MintJson {
                        milestone: mint.milestone,
                        status: "already_minted",
                        tx_hash: None,
                    },
                })
                .collect(),
        }
    }
}

async fn post_webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;

    let tip_required = match request.ty.as_str() {
        "tip" => true,
        "interaction" => false,
        other => {
            debug!("Ignoring webhook event type '{}'", other);
            return Ok(Json(json!({ "success": true, "ignored": true })));
        }
    };

    let data: WebhookData = serde_json::from_value(request.data)
        .map_err(|e| bad_request(format!("Invalid event data: {}", e)))?;

    let from = parse_address_field("fromAddress", data.from_address.as_deref())?;
    let to = parse_address_field("toAddress", data.to_address.as_deref())?;
    if from == to {
        return Err(bad_request("fromAddress and toAddress must differ"));
    }

    let tip = match data.amount.as_ref() {
        Some(amount) => parse_amount(amount)?,
        None if tip_required => return Err(bad_request("Missing field: amount")),
        None => U256::ZERO,
    };

    info!(
        "Webhook {} event {} -> {} ({} ETH)",
        request.ty,
        from,
        to,
        format_ether(tip)
    );

    let report = state
        .service
        .record_event(from, to, tip)
        .await
        .map_err(mint_error)?;

    let body = serde_json::to_value(WebhookResponse::from(&report)).map_err(internal_error)?;
    Ok(Json(body))
}

async fn get_relationship(
    State(state): State<AppState>,
    Path((user1, user2)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let user1 = parse_address_field("user1", Some(user1.as_str()))?;
    let user2 = parse_address_field("user2", Some(user2.as_str()))?;

    let relationship = match state
        .service
        .relationship(user1, user2)
        .await
        .map_err(internal_error)?
    {
        Some(rel) => rel,
        None => return Ok(Json(json!({ "exists": false }))),
    };

    let ready = state.service.ready_milestones(&relationship);
    let has_nft = state
        .service
        .has_relationship_nft(user1, user2)
        .await
        .map_err(|e| {
            warn!("hasRelationshipNFT read failed: {:#}", e);
            internal_error(format!("{:#}", e))
        })?;

    Ok(Json(json!({
        "exists": true,
        "relationship": RelationshipJson::from(&relationship),
        "readyMilestones": ready,
        "hasNFT": has_nft,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintRequest {
    user1: Option<String>,
    user2: Option<String>,
    milestone_type: Option<String>,
}

async fn post_mint(
    State(state): State<AppState>,
    payload: Result<Json<MintRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;

    let user1 = parse_address_field("user1", request.user1.as_deref())?;
    let user2 = parse_address_field("user2", request.user2.as_deref())?;
    let milestone = request
        .milestone_type
        .ok_or_else(|| bad_request("Missing field: milestoneType"))?;

    let receipt = state
        .service
        .mint(user1, user2, &milestone)
        .await
        .map_err(mint_error)?;

    Ok(Json(json!({
        "success": true,
        "milestone": receipt.milestone,
        "txHash": hex_b256(&receipt.tx_hash),
        "uris": receipt.metadata_uris,
    })))
}

async fn get_user_stats(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user = parse_address_field("address", Some(address.as_str()))?;

    let stats = state.service.user_stats(user).await.map_err(|e| {
        warn!("User stats for {} failed: {:#}", user, e);
        internal_error(format!("{:#}", e))
    })?;

    Ok(Json(json!({
        "address": stats.address.to_string(),
        "totalRelationships": stats.total_relationships,
        "totalInteractions": stats.total_interactions,
        "totalTips": format_ether(stats.total_tips),
        "totalTipsWei": stats.total_tips.to_string(),
        "nftCount": stats.nft_count.saturating_to::<u64>(),
    })))
}
