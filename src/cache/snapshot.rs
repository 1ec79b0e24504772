//! Immutable point-in-time copy of every config row.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::model::{ConfigEntry, Key};

/// All config entries indexed by service, then name.
#[derive(Debug, Clone)]
pub struct Snapshot {
    services: HashMap<String, HashMap<String, ConfigEntry>>,
    entries: usize,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    /// A snapshot holding nothing, served before the first refresh.
    pub fn empty() -> Self {
        Self {
            services: HashMap::new(),
            entries: 0,
            built_at: Utc::now(),
        }
    }

    /// Build from a full scan.
    ///
    /// Keys are unique in the store; if a scan ever repeats one, the row
    /// with the later `updated_at` is kept.
    pub fn build(rows: impl IntoIterator<Item = ConfigEntry>) -> Self {
        let mut services: HashMap<String, HashMap<String, ConfigEntry>> = HashMap::new();
        let mut entries = 0;

        for row in rows {
            let names = services.entry(row.key.service.clone()).or_default();
            match names.get(&row.key.config_name) {
                Some(existing) => {
                    tracing::warn!(key = %row.key, "Duplicate key in store scan");
                    if row.updated_at > existing.updated_at {
                        names.insert(row.key.config_name.clone(), row);
                    }
                }
                None => {
                    names.insert(row.key.config_name.clone(), row);
                    entries += 1;
                }
            }
        }

        Self {
            services,
            entries,
            built_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &Key) -> Option<&ConfigEntry> {
        self.find(&key.service, &key.config_name)
    }

    pub fn find(&self, service: &str, config_name: &str) -> Option<&ConfigEntry> {
        self.services.get(service)?.get(config_name)
    }

    /// Every entry of `service`, in no particular order.
    pub fn service_entries<'a>(&'a self, service: &str) -> impl Iterator<Item = &'a ConfigEntry> + 'a {
        self.services
            .get(service)
            .into_iter()
            .flat_map(|names| names.values())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Time since this snapshot was built.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.built_at
    }
}
