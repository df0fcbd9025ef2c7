#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform an activity source was imported from.
///
/// Each variant has its own payload layout; see the activity parser in the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Facebook page posts and comments (Graph API objects).
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "facebook"))]
    Facebook,
    /// Tweets (REST API v1.1 objects).
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "twitter"))]
    Twitter,
    /// Twitter direct message events.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "twitter_dm"))]
    TwitterDm,
    /// Crunchbase organisation records. Carry no author.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "crunchbase"))]
    Crunchbase,
    /// Anything else, imported with a `comment_id` / `user.id` layout.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "generic"))]
    Generic,
}

impl SourceType {
    pub const ALL: &'static [SourceType] = &[
        Self::Facebook,
        Self::Twitter,
        Self::TwitterDm,
        Self::Crunchbase,
        Self::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::TwitterDm => "twitter_dm",
            Self::Crunchbase => "crunchbase",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid source type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSourceTypeError {
    invalid: String,
}

impl fmt::Display for ParseSourceTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid source type '{}'. Valid values: {}",
            self.invalid,
            SourceType::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseSourceTypeError {}

impl FromStr for SourceType {
    type Err = ParseSourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseSourceTypeError {
                invalid: s.to_string(),
            })
    }
}
