use axum::Json;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::{error::AppError, models::TagSnapshot};

pub mod auth;
pub mod authors;
pub mod comments;
pub mod posts;
pub mod taxonomy;

/// HealthStatus
///
/// Body of the liveness probe.
#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

// --- Shared validation helpers ---

/// Trims `value` and fails with `message` when nothing is left.
pub fn required(value: &str, message: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

/// Like `required`, but only for fields that are present in a partial update.
pub fn required_if_present(
    value: Option<String>,
    message: &str,
) -> Result<Option<String>, AppError> {
    value.map(|v| required(&v, message)).transpose()
}

/// normalize_tags
///
/// Trims tag snapshots, drops entries without a slug, fills a missing name from the slug
/// and removes repeated slugs (first occurrence wins). Tag counters are keyed by slug, so
/// a post must never list the same slug twice.
pub fn normalize_tags(tags: Vec<TagSnapshot>) -> Vec<TagSnapshot> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let slug = tag.slug.trim().to_string();
            if slug.is_empty() || !seen.insert(slug.clone()) {
                return None;
            }
            let name = match tag.name.trim() {
                "" => slug.clone(),
                name => name.to_string(),
            };
            Some(TagSnapshot { name, slug })
        })
        .collect()
}
