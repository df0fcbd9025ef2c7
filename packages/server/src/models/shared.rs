use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for `?sources=1,2,3` style query parameters.
///
/// Absent or empty => `None`. Entries are trimmed; blanks are skipped.
pub fn comma_separated_ids<'de, D>(deserializer: D) -> Result<Option<Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| serde::de::Error::custom(format!("invalid id '{s}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if ids.is_empty() { None } else { Some(ids) })
}

/// Serde helper for PATCH semantics on optional fields: any value, including
/// `null`, counts as present.
pub fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(serde_json::Value::deserialize(deserializer)?))
}

/// Validate a tag name (1-128 characters after trimming).
pub fn validate_tag_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 128 {
        return Err(AppError::Validation(
            "Tag name must be 1-128 characters".into(),
        ));
    }
    Ok(())
}

/// Trim, validate and de-duplicate a list of tag names, keeping a stable order.
pub fn normalize_tag_names(names: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        validate_tag_name(name)?;
        let name = name.trim().to_string();
        if seen.insert(name.clone()) {
            out.push(name);
        }
    }
    Ok(out)
}

/// Clamp a requested page size into `1..=max`, falling back to `default`.
pub fn clamp_count(count: Option<u64>, default: u64, max: u64) -> u64 {
    count.unwrap_or(default).clamp(1, max)
}
