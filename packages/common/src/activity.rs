//! Platform payload layouts for imported activities.
//!
//! Every [`SourceType`] stores its activities as the raw platform object. The
//! variants below pick out the handful of fields the API needs: the platform id,
//! the author, the text and the creation time.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::SourceType;

const FACEBOOK_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const TWITTER_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid {source_type} payload: {detail}")]
    Malformed {
        source_type: SourceType,
        detail: String,
    },

    #[error("invalid timestamp in field '{field}': {value}")]
    InvalidTime { field: &'static str, value: String },
}

/// Author of an activity as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActivityUser {
    pub id: String,
    pub name: String,
}

/// Ids show up both as JSON strings and as numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum LooseId {
    Str(String),
    Int(i64),
}

impl LooseId {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Int(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacebookPost {
    id: String,
    #[serde(default)]
    from: Option<ActivityUser>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct TwitterUser {
    screen_name: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tweet {
    id_str: String,
    user: TwitterUser,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MessageData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct MessageCreate {
    sender_id: String,
    message_data: MessageData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectMessage {
    id: String,
    message_create: MessageCreate,
    #[serde(default)]
    created_timestamp: Option<LooseId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct GenericUser {
    id: LooseId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenericComment {
    comment_id: LooseId,
    user: GenericUser,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
}

/// A payload that has been checked against its source type's layout.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityPayload {
    Facebook(FacebookPost),
    Twitter(Tweet),
    TwitterDm(DirectMessage),
    /// Organisation records have no author and no id of their own.
    Crunchbase,
    Generic(GenericComment),
}

impl ActivityPayload {
    pub fn parse(source_type: SourceType, payload: &Value) -> Result<Self, PayloadError> {
        let parsed = match source_type {
            SourceType::Facebook => Self::Facebook(decode(source_type, payload)?),
            SourceType::Twitter => Self::Twitter(decode(source_type, payload)?),
            SourceType::TwitterDm => Self::TwitterDm(decode(source_type, payload)?),
            SourceType::Crunchbase => {
                if !payload.is_object() {
                    return Err(PayloadError::Malformed {
                        source_type,
                        detail: "expected a JSON object".into(),
                    });
                }
                Self::Crunchbase
            }
            SourceType::Generic => Self::Generic(decode(source_type, payload)?),
        };
        // Surface bad timestamps at import time rather than on every read.
        parsed.created_time()?;
        Ok(parsed)
    }

    /// Platform-side id, if the payload carries one.
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Facebook(post) => Some(post.id.clone()),
            Self::Twitter(tweet) => Some(tweet.id_str.clone()),
            Self::TwitterDm(dm) => Some(dm.id.clone()),
            Self::Crunchbase => None,
            Self::Generic(comment) => Some(comment.comment_id.clone().into_string()),
        }
    }

    pub fn user(&self) -> Option<ActivityUser> {
        match self {
            Self::Facebook(post) => post.from.clone(),
            Self::Twitter(tweet) => Some(ActivityUser {
                id: tweet.user.screen_name.clone(),
                name: tweet.user.name.clone(),
            }),
            Self::TwitterDm(dm) => Some(ActivityUser {
                id: dm.message_create.sender_id.clone(),
                name: dm.message_create.sender_id.clone(),
            }),
            Self::Crunchbase => None,
            Self::Generic(comment) => {
                let id = comment.user.id.clone().into_string();
                Some(ActivityUser {
                    name: id.clone(),
                    id,
                })
            }
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            Self::Facebook(post) => post.message.clone(),
            Self::Twitter(tweet) => tweet.full_text.clone().or_else(|| tweet.text.clone()),
            Self::TwitterDm(dm) => dm.message_create.message_data.text.clone(),
            Self::Crunchbase => None,
            Self::Generic(comment) => comment.text.clone(),
        }
    }

    pub fn created_time(&self) -> Result<Option<DateTime<Utc>>, PayloadError> {
        match self {
            Self::Facebook(post) => post
                .created_time
                .as_deref()
                .map(|raw| parse_with_format("created_time", raw, FACEBOOK_TIME_FORMAT))
                .transpose(),
            Self::Twitter(tweet) => tweet
                .created_at
                .as_deref()
                .map(|raw| parse_with_format("created_at", raw, TWITTER_TIME_FORMAT))
                .transpose(),
            Self::TwitterDm(dm) => dm
                .created_timestamp
                .clone()
                .map(|raw| {
                    let raw = raw.into_string();
                    raw.parse::<i64>()
                        .ok()
                        .and_then(DateTime::from_timestamp_millis)
                        .ok_or(PayloadError::InvalidTime {
                            field: "created_timestamp",
                            value: raw,
                        })
                })
                .transpose(),
            Self::Crunchbase => Ok(None),
            Self::Generic(comment) => comment
                .created_time
                .as_deref()
                .map(|raw| {
                    DateTime::parse_from_rfc3339(raw)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|_| PayloadError::InvalidTime {
                            field: "created_time",
                            value: raw.to_string(),
                        })
                })
                .transpose(),
        }
    }
}

fn decode<T: DeserializeOwned>(source_type: SourceType, payload: &Value) -> Result<T, PayloadError> {
    T::deserialize(payload).map_err(|e| PayloadError::Malformed {
        source_type,
        detail: e.to_string(),
    })
}

fn parse_with_format(
    field: &'static str,
    raw: &str,
    format: &str,
) -> Result<DateTime<Utc>, PayloadError> {
    DateTime::parse_from_str(raw, format)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| PayloadError::InvalidTime {
            field,
            value: raw.to_string(),
        })
}

/// Content-derived id for payloads imported without one: hex SHA-256 of the
/// compact JSON encoding.
pub fn payload_digest(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
