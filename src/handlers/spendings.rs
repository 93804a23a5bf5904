use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    Spending, SpendingCreateRequest, SpendingResponse, SpendingUpdateRequest, WebResponse,
};
use crate::state::AppState;

type SpendingReply = Json<WebResponse<SpendingResponse>>;

pub async fn create_spending(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpendingCreateRequest>, JsonRejection>,
) -> Result<(StatusCode, SpendingReply), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    // spendings always belong to a known user
    state.users.find_by_id(&payload.user_id)?;

    let spending = state.spendings.save(Spending {
        id: Uuid::new_v4().to_string(),
        user_id: payload.user_id,
        title: payload.title,
        description: payload.description,
        amount: payload.amount,
        date: payload.date,
        category: payload.category,
        created_at: chrono::Utc::now().timestamp_millis(),
    });

    let status = StatusCode::CREATED;
    Ok((status, Json(WebResponse::new(status, Some(spending.into())))))
}

pub async fn find_spending(
    State(state): State<Arc<AppState>>,
    Path(spending_id): Path<String>,
) -> Result<SpendingReply, ApiError> {
    let spending = state.spendings.find_by_id(&spending_id)?;
    Ok(Json(WebResponse::new(StatusCode::OK, Some(spending.into()))))
}

pub async fn find_user_spendings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<WebResponse<Vec<SpendingResponse>>>, ApiError> {
    let mut spendings = state.spendings.find_where(|s| s.user_id == user_id);
    spendings.sort_by_key(|s| s.date);

    let data: Vec<SpendingResponse> = spendings.into_iter().map(SpendingResponse::from).collect();
    Ok(Json(WebResponse::new(StatusCode::OK, Some(data))))
}

pub async fn update_spending(
    State(state): State<Arc<AppState>>,
    Path(spending_id): Path<String>,
    payload: Result<Json<SpendingUpdateRequest>, JsonRejection>,
) -> Result<SpendingReply, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let mut spending = state.spendings.find_by_id(&spending_id)?;
    spending.title = payload.title;
    spending.description = payload.description;
    spending.amount = payload.amount;
    spending.date = payload.date;
    spending.category = payload.category;

    let spending = state.spendings.update(spending)?;
    Ok(Json(WebResponse::new(StatusCode::OK, Some(spending.into()))))
}

pub async fn delete_spending(
    State(state): State<Arc<AppState>>,
    Path(spending_id): Path<String>,
) -> Result<Json<WebResponse<()>>, ApiError> {
    state.spendings.delete(&spending_id)?;
    Ok(Json(WebResponse::with_status(StatusCode::NO_CONTENT.as_u16(), "DELETED", None)))
}
