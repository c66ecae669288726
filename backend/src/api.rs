//! HTTP surface of the issuance service.
//!
//! The authenticated caller identity is supplied by the fronting transport in
//! the `x-caller` header; this layer only authorizes through the service's
//! role table. Errors are returned as `{"error": {"code", "message"}}`.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use atla_nft::{Account, AtlaError, AtlaNft, ItemId, RandomValue, RequestId, Role};
use serde::Deserialize;
use std::future::{Ready, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::metrics::Metrics;

/// Header carrying the authenticated caller account.
pub const CALLER_HEADER: &str = "x-caller";

/// Shared application state accessible from HTTP handlers.
pub struct AppState {
    pub service: Arc<AtlaNft>,
    /// Number of fulfillments currently in flight.
    pub in_flight: Arc<AtomicU64>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing x-caller header")]
    MissingCaller,
    #[error(transparent)]
    Service(#[from] AtlaError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingCaller => "MISSING_CALLER",
            Self::Service(e) => match e {
                AtlaError::Unauthorized { .. } => "UNAUTHORIZED",
                AtlaError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
                AtlaError::UnknownRequest(_) => "UNKNOWN_REQUEST",
                AtlaError::NotFound(_) => "NOT_FOUND",
                AtlaError::LastAdmin => "LAST_ADMIN",
                AtlaError::CounterOverflow => "COUNTER_OVERFLOW",
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCaller => StatusCode::UNAUTHORIZED,
            Self::Service(e) => match e {
                AtlaError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                AtlaError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                AtlaError::UnknownRequest(_) | AtlaError::NotFound(_) => StatusCode::NOT_FOUND,
                AtlaError::LastAdmin => StatusCode::CONFLICT,
                AtlaError::CounterOverflow => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }))
    }
}

/// Caller identity extracted from [`CALLER_HEADER`].
pub struct Caller(pub Account);

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req
            .headers()
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Caller(Account::new(s)))
            .ok_or(ApiError::MissingCaller);
        ready(caller)
    }
}

#[derive(Deserialize)]
struct AccountBody {
    account: Account,
}

#[derive(Deserialize)]
struct MintBody {
    to: Account,
}

#[derive(Deserialize)]
struct CreditBody {
    amount: u64,
}

#[derive(Deserialize)]
struct FulfillBody {
    request_id: RequestId,
    randomness: RandomValue,
}

/// Liveness probe, 200 while the process is running.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Readiness / status probe.
async fn status(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "running",
        "pending_requests": data.service.pending_count(),
        "in_flight_fulfillments": data.in_flight.load(Ordering::Relaxed),
        "fee_balance": data.service.fee_balance(),
        "total_supply": data.service.total_supply(),
    }))
}

async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.metrics.to_json())
}

async fn grant_role(
    data: web::Data<AppState>,
    role: web::Path<String>,
    caller: Caller,
    body: web::Json<AccountBody>,
) -> Result<HttpResponse, ApiError> {
    let role = Role::new(role.into_inner());
    let account = body.into_inner().account;
    let changed = data.service.grant_role(&role, account.clone(), &caller.0)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "role": role,
        "account": account,
        "changed": changed,
    })))
}

async fn revoke_role(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let (role, account) = path.into_inner();
    let role = Role::new(role);
    let account = Account::new(account);
    let changed = data.service.revoke_role(&role, &account, &caller.0)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "role": role,
        "account": account,
        "changed": changed,
    })))
}

async fn has_role(data: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (role, account) = path.into_inner();
    let role = Role::new(role);
    let account = Account::new(account);
    let member = data.service.has_role(&role, &account);
    HttpResponse::Ok().json(serde_json::json!({
        "role": role,
        "account": account,
        "member": member,
    }))
}

async fn mint(
    data: web::Data<AppState>,
    caller: Caller,
    body: web::Json<MintBody>,
) -> Result<HttpResponse, ApiError> {
    let to = body.into_inner().to;
    let item_id = data.service.mint(to.clone(), &caller.0)?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "item_id": item_id,
        "owner": to,
    })))
}

async fn owner_of(
    data: web::Data<AppState>,
    item_id: web::Path<ItemId>,
) -> Result<HttpResponse, ApiError> {
    let item_id = item_id.into_inner();
    let owner = data.service.owner_of(item_id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "item_id": item_id,
        "owner": owner,
    })))
}

async fn item(
    data: web::Data<AppState>,
    item_id: web::Path<ItemId>,
) -> Result<HttpResponse, ApiError> {
    let item = data.service.item(item_id.into_inner())?;
    Ok(HttpResponse::Ok().json(item))
}

async fn balance_of(data: web::Data<AppState>, account: web::Path<String>) -> HttpResponse {
    let account = Account::new(account.into_inner());
    let balance = data.service.balance_of(&account);
    HttpResponse::Ok().json(serde_json::json!({
        "account": account,
        "balance": balance,
    }))
}

async fn credit_fees(
    data: web::Data<AppState>,
    body: web::Json<CreditBody>,
) -> Result<HttpResponse, ApiError> {
    let balance = data.service.credit_fees(body.amount)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "balance": balance })))
}

async fn fee_balance(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "balance": data.service.fee_balance(),
        "request_fee": data.service.request_fee(),
    }))
}

async fn request_randomness(
    data: web::Data<AppState>,
    caller: Caller,
) -> Result<HttpResponse, ApiError> {
    let request_id = data.service.request_randomness(caller.0)?;
    Ok(HttpResponse::Accepted().json(serde_json::json!({ "request_id": request_id })))
}

async fn pending_requests(data: web::Data<AppState>) -> HttpResponse {
    let requests = data.service.pending_requests();
    HttpResponse::Ok().json(serde_json::json!({
        "count": requests.len(),
        "requests": requests,
    }))
}

async fn fulfill(
    data: web::Data<AppState>,
    caller: Caller,
    body: web::Json<FulfillBody>,
) -> Result<HttpResponse, ApiError> {
    let FulfillBody {
        request_id,
        randomness,
    } = body.into_inner();
    let fulfilled = data
        .service
        .fulfill_randomness(&caller.0, request_id, randomness)?;
    Ok(HttpResponse::Ok().json(fulfilled))
}

async fn reward(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.service.reward())
}

/// Register all routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .route("/metrics", web::get().to(metrics))
        .route("/roles/{role}/members", web::post().to(grant_role))
        .route("/roles/{role}/members/{account}", web::get().to(has_role))
        .route("/roles/{role}/members/{account}", web::delete().to(revoke_role))
        .route("/items", web::post().to(mint))
        .route("/items/{id}", web::get().to(item))
        .route("/items/{id}/owner", web::get().to(owner_of))
        .route("/accounts/{account}/balance", web::get().to(balance_of))
        .route("/fees", web::post().to(credit_fees))
        .route("/fees", web::get().to(fee_balance))
        .route("/randomness", web::post().to(request_randomness))
        .route("/randomness/pending", web::get().to(pending_requests))
        .route("/oracle/fulfill", web::post().to(fulfill))
        .route("/reward", web::get().to(reward));
}
