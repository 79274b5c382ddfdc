//! Request handlers for the journal API
//!
//! Every `/api` handler except the insight preflight takes an `AuthUser`, so
//! unauthenticated requests are rejected before any store access.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::auth::AuthUser;
use crate::cache::CacheKey;
use crate::db::trades::{SortOrder, TradeQuery};
use crate::error::{AppError, Result};
use crate::insight::InsightReport;
use crate::models::{Catalog, Rule, RuleInput, Trade, TradeFilters, TradeForm};
use crate::stats::{build_equity_curve, month_pnl, month_total, summarize, CalendarMonth, DayPnl, EquityPoint, TradeMetrics};

const RECENT_DEFAULT: u32 = 5;
const RECENT_MAX: u32 = 50;

// ============================================================================
// Health Check
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Trades
// ============================================================================

/// The user's full history, newest first, through the query cache
async fn all_trades(state: &AppState, user_id: &str) -> Result<Arc<Vec<Trade>>> {
    let db = &state.db;
    state
        .cache
        .get_or_load(user_id, CacheKey::Trades, move || async move {
            db.list_trades(user_id, &TradeQuery::default())
        })
        .await
}

/// GET /api/trades?symbol=&start=&end=
pub async fn list_trades(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filters): ApiQuery<TradeFilters>,
) -> Result<Json<Vec<Trade>>> {
    let trades = all_trades(&state, &user.user_id).await?;

    Ok(Json(filters.apply(&trades)))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<u32>,
}

/// GET /api/trades/recent?limit=N
pub async fn recent_trades(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<RecentParams>,
) -> Result<Json<Vec<Trade>>> {
    let limit = params.limit.unwrap_or(RECENT_DEFAULT).clamp(1, RECENT_MAX);
    let query = TradeQuery {
        order: SortOrder::Descending,
        limit: Some(limit),
        ..Default::default()
    };

    Ok(Json(state.db.list_trades(&user.user_id, &query)?))
}

/// GET /api/trades/{id}
pub async fn get_trade(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Trade>> {
    Ok(Json(state.db.get_trade(&user.user_id, &id)?))
}

/// POST /api/trades
pub async fn create_trade(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(form): ApiJson<TradeForm>,
) -> Result<impl IntoResponse> {
    let new_trade = form.into_new_trade(Utc::now().naive_utc())?;
    let trade = state.db.insert_trade(&user.user_id, &new_trade)?;
    state.cache.invalidate_user(&user.user_id).await;

    Ok((StatusCode::CREATED, Json(trade)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// DELETE /api/trades/{id}?confirm=true
pub async fn delete_trade(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiQuery(params): ApiQuery<DeleteParams>,
) -> Result<StatusCode> {
    if !params.confirm {
        return Err(AppError::Validation(
            "deleting a trade is permanent; repeat the request with confirm=true".to_string(),
        ));
    }

    state.db.delete_trade(&user.user_id, &id)?;
    state.cache.invalidate_user(&user.user_id).await;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Dashboard & Calendar
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub metrics: TradeMetrics,
    pub equity_curve: Vec<EquityPoint>,
}

/// GET /api/dashboard
pub async fn dashboard(State(state): State<AppState>, user: AuthUser) -> Result<Json<DashboardResponse>> {
    let trades = all_trades(&state, &user.user_id).await?;

    // Oldest first: emotion ties go to the earliest trade and trades sharing
    // a timestamp keep insertion order on the curve
    let chronological: Vec<Trade> = trades.iter().rev().cloned().collect();

    Ok(Json(DashboardResponse {
        metrics: summarize(&chronological),
        equity_curve: build_equity_curve(&chronological),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub month: String,
    pub total_pnl: Decimal,
    pub days: Vec<DayPnl>,
}

/// GET /api/calendar?month=YYYY-MM, defaulting to the current month
pub async fn calendar(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<CalendarParams>,
) -> Result<Json<CalendarResponse>> {
    let month = match params.month.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.parse::<CalendarMonth>()?,
        _ => CalendarMonth::containing(Utc::now().date_naive()),
    };

    let (db, user_id) = (&state.db, user.user_id.as_str());
    let trades = state
        .cache
        .get_or_load(user_id, CacheKey::TradesForMonth(month), move || async move {
            let (from, to) = month.bounds();
            let query = TradeQuery {
                from: Some(from),
                to: Some(to),
                order: SortOrder::Ascending,
                limit: None,
            };
            db.list_trades(user_id, &query)
        })
        .await?;

    let days = month_pnl(month, &trades);
    let total_pnl = month_total(&days);

    Ok(Json(CalendarResponse {
        month: month.to_string(),
        total_pnl,
        days,
    }))
}

/// GET /api/catalog
pub async fn catalog() -> Json<Catalog> {
    Json(Catalog::standard())
}

// ============================================================================
// Rules
// ============================================================================

/// GET /api/rules
pub async fn list_rules(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Rule>>> {
    Ok(Json(state.db.list_rules(&user.user_id)?))
}

/// POST /api/rules
pub async fn create_rule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<RuleInput>,
) -> Result<impl IntoResponse> {
    let rule = state.db.create_rule(&user.user_id, input)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

#[derive(Debug, Deserialize)]
pub struct RenameRule {
    pub nombre: String,
}

/// PUT /api/rules/{id}
pub async fn rename_rule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<RenameRule>,
) -> Result<Json<Rule>> {
    Ok(Json(state.db.rename_rule(&user.user_id, &id, &body.nombre)?))
}

/// DELETE /api/rules/{id}
pub async fn delete_rule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Result<StatusCode> {
    state.db.delete_rule(&user.user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Insight
// ============================================================================

/// OPTIONS /api/insight
pub async fn insight_preflight() -> &'static str {
    "ok"
}

/// GET or POST /api/insight
pub async fn insight(State(state): State<AppState>, user: AuthUser) -> Result<Json<InsightReport>> {
    let trades = state.db.list_trades(&user.user_id, &TradeQuery::default())?;
    log::info!(
        "Running {} insight over {} trades for {}",
        state.insight.name(),
        trades.len(),
        user.user_id
    );

    Ok(Json(state.insight.analyze(&trades).await?))
}
