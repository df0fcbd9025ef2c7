use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::shared::present;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TagSetResponse {
    pub id: i32,
    #[schema(example = "Sentiment")]
    pub title: String,
    #[schema(example = json!(["positive", "negative"]))]
    pub tags: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagSetListResponse {
    #[serde(rename = "tagSets")]
    pub tag_sets: Vec<TagSetResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTagSetRequest {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. `tags` are added to the set, never removed.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateTagSetRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Validate a tagset title (1-256 characters after trimming).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}
