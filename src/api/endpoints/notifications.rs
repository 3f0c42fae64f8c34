//! Notification inbox endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jobs::parse_id;
use super::profiles::require_module;
use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext, DataEnvelope};
use crate::authorization::Module;
use crate::db::repository;
use crate::models::Notification;
use crate::notifications::INBOX_SIZE;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub recipient_id: Uuid,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAllRequest {
    pub recipient_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub updated: usize,
}

/// `GET /api/notifications?recipient_id=...` — newest first. The recipient
/// must be able to open the notifications module.
pub async fn inbox(
    State(ctx): State<ApiContext>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<DataEnvelope<Vec<Notification>>>, ApiError> {
    let store = ctx.core.store().clone();
    let limit = query.limit.unwrap_or(INBOX_SIZE);
    let rows = run_blocking(move || {
        require_module(&store, &query.recipient_id, Module::Notifications)?;
        Ok(store.read(|conn| {
            repository::list_notifications_for_recipient(conn, &query.recipient_id, limit)
        })?)
    })
    .await?;
    Ok(Json(DataEnvelope::new(rows)))
}

/// `POST /api/notifications/:id/read`
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Path(notification_id): Path<String>,
) -> Result<Json<DataEnvelope<Notification>>, ApiError> {
    let id = parse_id(&notification_id)?;
    let store = ctx.core.store().clone();
    let row = run_blocking(move || Ok(store.mark_notification_read(&id)?)).await?;
    Ok(Json(DataEnvelope::new(row)))
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read(
    State(ctx): State<ApiContext>,
    Json(request): Json<MarkAllRequest>,
) -> Result<Json<DataEnvelope<MarkAllResponse>>, ApiError> {
    let store = ctx.core.store().clone();
    let updated = run_blocking(move || {
        require_module(&store, &request.recipient_id, Module::Notifications)?;
        Ok(store.mark_all_notifications_read(&request.recipient_id)?.len())
    })
    .await?;
    Ok(Json(DataEnvelope::new(MarkAllResponse { updated })))
}
