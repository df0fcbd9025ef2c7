use common::SourceType;
use serde::{Deserialize, Serialize};

use crate::entity::source;
use crate::error::AppError;
use crate::models::shared::present;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SourceResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[schema(example = "https://www.facebook.com/fanlens.io")]
    pub uri: String,
    #[schema(example = "fanlens.io")]
    pub slug: String,
}

impl From<source::Model> for SourceResponse {
    fn from(s: source::Model) -> Self {
        Self {
            id: s.id,
            source_type: s.source_type,
            uri: s.uri,
            slug: s.slug,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SourceListResponse {
    pub sources: Vec<SourceResponse>,
}

/// Request body for creating a source. Ids are assigned by the server.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSourceRequest {
    /// Must be absent.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub id: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub uri: String,
    pub slug: String,
}

pub fn validate_create_source(payload: &CreateSourceRequest) -> Result<(), AppError> {
    if payload.id.is_some() {
        return Err(AppError::Validation(
            "id not allowed, will be assigned".into(),
        ));
    }
    validate_uri_and_slug(Some(&payload.uri), Some(&payload.slug))
}

/// Partial update. `id` and `type` are immutable.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateSourceRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub id: Option<serde_json::Value>,
    #[serde(default, rename = "type", deserialize_with = "present")]
    #[schema(value_type = Option<SourceType>)]
    pub source_type: Option<serde_json::Value>,
    pub uri: Option<String>,
    pub slug: Option<String>,
}

pub fn validate_update_source(payload: &UpdateSourceRequest) -> Result<(), AppError> {
    if payload.id.is_some() {
        return Err(AppError::Forbidden("source id cannot be changed".into()));
    }
    if payload.source_type.is_some() {
        return Err(AppError::Forbidden("source type cannot be changed".into()));
    }
    validate_uri_and_slug(payload.uri.as_deref(), payload.slug.as_deref())
}

fn validate_uri_and_slug(uri: Option<&str>, slug: Option<&str>) -> Result<(), AppError> {
    if let Some(uri) = uri
        && (uri.trim().is_empty() || uri.len() > 2048)
    {
        return Err(AppError::Validation("uri must be 1-2048 characters".into()));
    }
    if let Some(slug) = slug
        && (slug.trim().is_empty() || slug.chars().count() > 256)
    {
        return Err(AppError::Validation("slug must be 1-256 characters".into()));
    }
    Ok(())
}
