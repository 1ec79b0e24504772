//! Request and response types for client polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of `POST /configs/values`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ValuesRequest {
    pub service: Option<String>,

    /// Names to fetch. Absent or empty means every entry of the service.
    pub ids: Option<Vec<String>>,

    /// Return only entries with `updated_at >= updated_since`.
    #[serde(deserialize_with = "empty_string_as_none")]
    pub updated_since: Option<DateTime<Utc>>,
}

impl ValuesRequest {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Self::default()
        }
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

/// Body returned by `POST /configs/values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesResponse {
    /// Every matching entry's value by name, kill switches included.
    pub configs: BTreeMap<String, Value>,
    pub kill_switches_enabled: Vec<String>,
    pub kill_switches_disabled: Vec<String>,
    /// Watermark to send back as `updated_since` on the next poll.
    pub updated_at: DateTime<Utc>,
}
