use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use permafolio::allocation::AssetOverview;
use permafolio::models::{Holding, HoldingPatch, HoldingView, Id, NewHolding};
use permafolio::rebalancing::RebalancingResult;
use permafolio::report::DailyReport;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header naming the user whose holdings a request operates on.
pub const USER_HEADER: &str = "x-user-id";

/// The requesting user, taken from `X-User-Id` or the configured default.
pub struct UserId(pub Id);

impl FromRequestParts<Arc<AppState>> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        user_from_headers(&parts.headers, &state.default_user).map(UserId)
    }
}

fn user_from_headers(headers: &HeaderMap, default_user: &Id) -> ApiResult<Id> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(default_user.clone());
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("{USER_HEADER} is not valid text")))?
        .trim();
    if value.is_empty() {
        return Ok(default_user.clone());
    }
    Ok(Id::from_string_checked(value)?)
}

fn parse_id(raw: &str) -> ApiResult<Id> {
    Ok(Id::from_string_checked(raw)?)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn view(holding: Holding) -> ApiResult<HoldingView> {
    Ok(HoldingView::try_from(holding)?)
}

fn views(holdings: Vec<Holding>) -> ApiResult<Vec<HoldingView>> {
    holdings.into_iter().map(view).collect()
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub asset_ids: Vec<String>,
}

async fn rebalancing_suggestions(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> ApiResult<Json<RebalancingResult>> {
    Ok(Json(state.service.rebalancing(&user).await?))
}

async fn list_assets(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> ApiResult<Json<Vec<HoldingView>>> {
    let holdings = state.service.list_holdings(&user).await?;
    Ok(Json(views(holdings)?))
}

async fn create_asset(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    payload: Result<Json<NewHolding>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<HoldingView>)> {
    let input = body(payload)?;
    let holding = state.service.create_holding(&user, input).await?;
    Ok((StatusCode::CREATED, Json(view(holding)?)))
}

async fn update_asset(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
    payload: Result<Json<HoldingPatch>, JsonRejection>,
) -> ApiResult<Json<HoldingView>> {
    let id = parse_id(&id)?;
    let patch = body(payload)?;
    let holding = state.service.update_holding(&user, &id, patch).await?;
    Ok(Json(view(holding)?))
}

async fn delete_asset(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_holding(&user, &parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn batch_delete_assets(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    payload: Result<Json<BatchDeleteRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = body(payload)?;
    let ids = request
        .asset_ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<ApiResult<Vec<_>>>()?;
    let deleted = state.service.delete_holdings(&user, &ids).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn refresh_asset(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<HoldingView>> {
    let holding = state.service.refresh_holding(&user, &parse_id(&id)?).await?;
    Ok(Json(view(holding)?))
}

async fn refresh_all_assets(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> ApiResult<Json<Vec<HoldingView>>> {
    let holdings = state.service.refresh_all(&user).await?;
    Ok(Json(views(holdings)?))
}

async fn asset_overview(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> ApiResult<Json<AssetOverview>> {
    Ok(Json(state.service.overview(&user).await?))
}

async fn daily_report(
    State(state): State<Arc<AppState>>,
    UserId(user): UserId,
) -> ApiResult<Json<DailyReport>> {
    Ok(Json(state.service.daily_report(&user).await?))
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let version = env!("CARGO_PKG_VERSION");
    match state.service.check_storage().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "version": version, "storage": "ok" })),
        ),
        Err(e) => {
            warn!(error = %e, "storage health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "version": version, "storage": "unavailable" })),
            )
        }
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/rebalancing/suggestions", get(rebalancing_suggestions))
        .route("/rebalancing/suggestions", get(rebalancing_suggestions))
        .route("/api/assets", get(list_assets).post(create_asset))
        .route("/api/assets/overview", get(asset_overview))
        .route("/api/assets/batch-delete", post(batch_delete_assets))
        .route("/api/assets/refresh-all", post(refresh_all_assets))
        .route("/api/assets/{id}", put(update_asset).delete(delete_asset))
        .route("/api/assets/{id}/refresh", post(refresh_asset))
        .route("/api/reports/daily", get(daily_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_header_falls_back_to_default() {
        let default_user = Id::from("local");
        let mut headers = HeaderMap::new();
        assert_eq!(user_from_headers(&headers, &default_user).unwrap(), default_user);

        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(user_from_headers(&headers, &default_user).unwrap(), default_user);

        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(
            user_from_headers(&headers, &default_user).unwrap(),
            Id::from("alice")
        );
    }

    #[test]
    fn test_user_header_rejects_path_segments() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("../bob"));
        assert!(user_from_headers(&headers, &Id::from("local")).is_err());
    }
}
