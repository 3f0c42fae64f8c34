//! Staff profile lookups: navigation modules and module gating.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::jobs::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext, DataEnvelope};
use crate::authorization::{check_module_access, visible_modules, Module};
use crate::db::repository;
use crate::models::Profile;
use crate::store::RecordStore;

#[derive(Debug, Serialize)]
pub struct ModuleEntry {
    pub module: Module,
    pub path: &'static str,
}

/// Load `profile_id` and refuse it unless it may open `module`.
pub(crate) fn require_module(
    store: &RecordStore,
    profile_id: &Uuid,
    module: Module,
) -> Result<Profile, ApiError> {
    let profile = store
        .read(|conn| repository::get_profile(conn, profile_id))?
        .ok_or_else(|| ApiError::NotFound(format!("Profile {profile_id}")))?;
    if !check_module_access(&profile, module).allowed {
        return Err(ApiError::Forbidden(format!(
            "Profile {profile_id} may not open {}",
            module.path()
        )));
    }
    Ok(profile)
}

/// `GET /api/profiles/:id/modules` — navigation entries, empty for an
/// inactive profile.
pub async fn modules(
    State(ctx): State<ApiContext>,
    Path(profile_id): Path<String>,
) -> Result<Json<DataEnvelope<Vec<ModuleEntry>>>, ApiError> {
    let id = parse_id(&profile_id)?;
    let store = ctx.core.store().clone();
    let profile = run_blocking(move || {
        store
            .read(|conn| repository::get_profile(conn, &id))?
            .ok_or_else(|| ApiError::NotFound(format!("Profile {id}")))
    })
    .await?;

    let entries = visible_modules(profile.role)
        .into_iter()
        .filter(|m| check_module_access(&profile, *m).allowed)
        .map(|module| ModuleEntry {
            module,
            path: module.path(),
        })
        .collect();
    Ok(Json(DataEnvelope::new(entries)))
}
