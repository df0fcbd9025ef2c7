use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::models::shared::comma_separated_ids;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagListQuery {
    /// Include per-tag activity counts.
    #[serde(default)]
    pub with_count: bool,
    /// Comma-separated source ids. Restricts counts to these sources and omits
    /// tags without activities in them.
    #[serde(default, deserialize_with = "comma_separated_ids")]
    #[param(value_type = Option<String>, example = "1,2")]
    pub sources: Option<Vec<i32>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagListResponse {
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, u64>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    #[serde(default)]
    pub with_count: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TagResponse {
    #[schema(example = "spam")]
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}
