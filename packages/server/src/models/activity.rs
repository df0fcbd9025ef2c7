use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::ActivityUser;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::models::shared::comma_separated_ids;
use crate::models::source::SourceResponse;

/// `created_time` reported for activities without a timestamp.
pub const EPOCH_TIME: &str = "1970-01-01T00:00:00+00:00";
/// `language` reported for activities without a detected language.
pub const UNKNOWN_LANGUAGE: &str = "un";

/// Client view of a stored activity.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ActivityView {
    /// Platform-side id.
    #[schema(example = "850006245121695744")]
    pub id: String,
    /// Author; `null` for sources without authors.
    pub user: Option<ActivityUser>,
    pub text: String,
    pub source: SourceResponse,
    pub tags: Vec<String>,
    #[schema(example = "2017-04-06T15:24:15+00:00")]
    pub created_time: String,
    #[schema(example = "en")]
    pub language: String,
    /// Tag name -> score, from the caller's best models only.
    pub prediction: BTreeMap<String, f64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityListResponse {
    pub activities: Vec<ActivityView>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityListQuery {
    /// Comma-separated source ids. Defaults to all of the caller's sources.
    #[serde(default, deserialize_with = "comma_separated_ids")]
    #[param(value_type = Option<String>, example = "1,2")]
    pub sources: Option<Vec<i32>>,
    /// Page size. Default 100, max 1000.
    pub count: Option<u64>,
    /// Only activities whose platform id sorts before this one.
    pub max_id: Option<String>,
    /// Random sample instead of newest first.
    #[serde(default)]
    pub random: bool,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Comma-separated tagset ids. Only activities tagged with a tag of these sets.
    #[serde(default, deserialize_with = "comma_separated_ids")]
    #[param(value_type = Option<String>, example = "3,4")]
    pub tagsets: Option<Vec<i32>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaggedActivitiesQuery {
    #[serde(default, deserialize_with = "comma_separated_ids")]
    #[param(value_type = Option<String>, example = "1,2")]
    pub sources: Option<Vec<i32>>,
    /// Default 10, max 1000.
    pub count: Option<u64>,
    #[serde(default)]
    pub random: bool,
}

/// One activity to import.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportActivity {
    pub source_id: Option<i32>,
    /// Platform-side id. Derived from the payload digest when absent.
    pub id: Option<String>,
    /// Raw platform object.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub language: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkImportRequest {
    pub activities: Vec<ImportActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, utoipa::ToSchema)]
pub struct ImportedActivity {
    pub id: String,
    pub source_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkImportResponse {
    pub activities: Vec<ImportedActivity>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityTagsResponse {
    pub id: String,
    pub tags: Vec<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PatchTagsRequest {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestionQuery {
    /// Model to predict with. Falls back to the configured default model.
    pub model_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivitySuggestionResponse {
    pub id: String,
    pub suggestion: BTreeMap<String, f64>,
}
