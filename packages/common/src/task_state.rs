#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a remote task as last reported by the worker.
///
/// There is no `Pending` variant: a task the worker has not picked up yet has no
/// recorded state at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum TaskState {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Started"))]
    Started,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Succeeded"))]
    Succeeded,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Failed"))]
    Failed,
}

impl TaskState {
    /// Returns true once the worker will not report anything else for the task.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Started)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
