//! Lenient decoding of client-supplied user ids.
//!
//! Browsers send `user_id` both as a JSON number and as a string (it
//! usually comes straight out of local storage), so accept either.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// `deserialize_with` helper for `Option<i64>` id fields. `null` and blank
/// strings decode to `None`; anything else must be an integer.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(raw)) => parse_id(&raw)
            .map_err(|_| D::Error::custom(format!("invalid user id: {:?}", raw))),
    }
}

/// Parses a textual id. Blank means absent.
pub fn parse_id(raw: &str) -> Result<Option<i64>, std::num::ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some)
}
