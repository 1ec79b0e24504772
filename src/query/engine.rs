//! Delta query evaluation against the current snapshot.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{ConfigCache, Snapshot};
use crate::model::{ConfigEntry, Mode, ValidationError};
use crate::query::types::{ValuesRequest, ValuesResponse};

const QUERY_REQUIRED: &[&str] = &["service"];

/// Answers client polls from the latest snapshot.
#[derive(Clone)]
pub struct QueryEngine {
    cache: Arc<ConfigCache>,
    default_service: Option<String>,
}

impl QueryEngine {
    pub fn new(cache: Arc<ConfigCache>, default_service: Option<String>) -> Self {
        Self {
            cache,
            default_service,
        }
    }

    /// Evaluate `request` against the current snapshot.
    pub fn query(&self, request: &ValuesRequest) -> Result<ValuesResponse, ValidationError> {
        let service = request.service.as_deref().unwrap_or_default();
        if service.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                fields: QUERY_REQUIRED,
            });
        }

        let snapshot = self.cache.current();
        Ok(evaluate(
            &snapshot,
            service,
            request.ids.as_deref(),
            request.updated_since,
            self.default_service.as_deref(),
            Utc::now,
        ))
    }
}

/// Pure query over one snapshot.
///
/// `now` is only consulted when nothing matches.
pub fn evaluate(
    snapshot: &Snapshot,
    service: &str,
    ids: Option<&[String]>,
    since: Option<DateTime<Utc>>,
    default_service: Option<&str>,
    now: impl FnOnce() -> DateTime<Utc>,
) -> ValuesResponse {
    let candidates = select(snapshot, service, ids, default_service);

    let mut configs = BTreeMap::new();
    let mut kill_switches_enabled = Vec::new();
    let mut kill_switches_disabled = Vec::new();
    let mut watermark: Option<DateTime<Utc>> = None;

    for entry in candidates {
        if since.is_some_and(|since| entry.updated_at < since) {
            continue;
        }

        let name = entry.key.config_name.clone();
        match entry.mode {
            Mode::DynamicConfig => {}
            Mode::KillSwitchEnabled => kill_switches_enabled.push(name.clone()),
            Mode::KillSwitchDisabled => kill_switches_disabled.push(name.clone()),
        }
        configs.insert(name, entry.value.clone());
        watermark = Some(watermark.map_or(entry.updated_at, |w| w.max(entry.updated_at)));
    }

    kill_switches_enabled.sort();
    kill_switches_disabled.sort();

    ValuesResponse {
        configs,
        kill_switches_enabled,
        kill_switches_disabled,
        updated_at: watermark.unwrap_or_else(now),
    }
}

/// Candidate entries before the `since` filter.
///
/// Explicit ids fall back to `default_service` for names the service does
/// not define; service-wide scans never merge defaults.
fn select<'a>(
    snapshot: &'a Snapshot,
    service: &str,
    ids: Option<&[String]>,
    default_service: Option<&str>,
) -> Vec<&'a ConfigEntry> {
    match ids {
        Some(ids) if !ids.is_empty() => {
            let mut seen = std::collections::BTreeSet::new();
            ids.iter()
                .filter(|id| seen.insert(id.as_str()))
                .filter_map(|id| {
                    snapshot.find(service, id).or_else(|| {
                        default_service
                            .filter(|fallback| *fallback != service)
                            .and_then(|fallback| snapshot.find(fallback, id))
                    })
                })
                .collect()
        }
        _ => snapshot.service_entries(service).collect(),
    }
}
