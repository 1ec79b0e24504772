//! Write validation and mode classification.
//!
//! Turns a raw submission into one all-names batch. Pure: no I/O, no clock.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Mode, ValidationError};

const WRITE_REQUIRED: &[&str] = &["configs", "service"];
const DELETE_REQUIRED: &[&str] = &["ids", "service"];

/// Body of `POST /admin/v1/configs`.
///
/// Every field is optional at the serde level so that absent and empty
/// fields produce the same validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigSubmission {
    pub service: Option<String>,
    pub configs: Option<BTreeMap<String, Value>>,
    pub kill_switches_enabled: Option<BTreeSet<String>>,
    pub kill_switches_disabled: Option<BTreeSet<String>>,
}

/// Body of `POST /admin/v1/configs/delete`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRequest {
    pub service: Option<String>,
    pub ids: Option<BTreeSet<String>>,
}

/// Validated upsert payload: every submitted name with its value and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    pub service: String,
    pub values: BTreeMap<String, Value>,
    pub modes: BTreeMap<String, Mode>,
}

impl WriteBatch {
    /// Number of names carrying `mode`.
    pub fn count(&self, mode: Mode) -> usize {
        self.modes.values().filter(|m| **m == mode).count()
    }
}

/// Validated delete payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBatch {
    pub service: String,
    pub names: BTreeSet<String>,
}

/// Assign a mode to every name of `configs`.
///
/// Checks run in order: required fields, set overlap, unknown ids.
pub fn classify(
    service: &str,
    configs: &BTreeMap<String, Value>,
    enabled: &BTreeSet<String>,
    disabled: &BTreeSet<String>,
) -> Result<BTreeMap<String, Mode>, ValidationError> {
    if service.is_empty() || configs.is_empty() {
        return Err(ValidationError::MissingRequiredField {
            fields: WRITE_REQUIRED,
        });
    }

    let overlap: Vec<String> = enabled.intersection(disabled).cloned().collect();
    if !overlap.is_empty() {
        return Err(ValidationError::KillSwitchSetOverlap { ids: overlap });
    }

    let unknown: Vec<String> = enabled
        .iter()
        .chain(disabled.iter())
        .filter(|id| !configs.contains_key(*id))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownKillSwitchId { ids: unknown });
    }

    Ok(configs
        .keys()
        .map(|name| {
            let mode = if enabled.contains(name) {
                Mode::KillSwitchEnabled
            } else if disabled.contains(name) {
                Mode::KillSwitchDisabled
            } else {
                Mode::DynamicConfig
            };
            (name.clone(), mode)
        })
        .collect())
}

impl ConfigSubmission {
    /// Validate and classify into a single upsert batch.
    pub fn into_batch(self) -> Result<WriteBatch, ValidationError> {
        let service = self.service.unwrap_or_default();
        let values = self.configs.unwrap_or_default();
        let modes = classify(
            &service,
            &values,
            &self.kill_switches_enabled.unwrap_or_default(),
            &self.kill_switches_disabled.unwrap_or_default(),
        )?;

        Ok(WriteBatch {
            service,
            values,
            modes,
        })
    }
}

impl DeleteRequest {
    pub fn into_batch(self) -> Result<DeleteBatch, ValidationError> {
        let service = self.service.unwrap_or_default();
        let names = self.ids.unwrap_or_default();
        if service.is_empty() || names.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                fields: DELETE_REQUIRED,
            });
        }
        Ok(DeleteBatch { service, names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn configs(ids: &[&str]) -> BTreeMap<String, Value> {
        ids.iter().map(|s| (s.to_string(), json!("value"))).collect()
    }

    #[test]
    fn test_scenario_svc1_enabled_b() {
        let submission: ConfigSubmission = serde_json::from_value(json!({
            "service": "svc1",
            "configs": {"a": 1, "b": true},
            "kill_switches_enabled": ["b"],
        }))
        .unwrap();

        let batch = submission.into_batch().unwrap();
        assert_eq!(batch.service, "svc1");
        assert_eq!(batch.modes["a"], Mode::DynamicConfig);
        assert_eq!(batch.modes["b"], Mode::KillSwitchEnabled);
        assert_eq!(batch.values["b"], json!(true));
    }

    #[test]
    fn test_unknown_kill_switch_id() {
        let err = classify("svc1", &configs(&["a"]), &names(&["x"]), &names(&[])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownKillSwitchId {
                ids: vec!["x".to_string()]
            }
        );

        for (enabled, disabled) in [(vec!["E"], vec![]), (vec![], vec!["D"]), (vec!["E"], vec!["D"])] {
            let err = classify("svc", &configs(&["DYNAMIC"]), &names(&enabled), &names(&disabled))
                .unwrap_err();
            assert!(matches!(err, ValidationError::UnknownKillSwitchId { .. }));
        }
    }

    #[test]
    fn test_overlap_reported_regardless_of_order() {
        let cases: [(&[&str], &[&str]); 4] = [
            (&["FIRST"], &["FIRST"]),
            (&["FIRST"], &["FIRST", "SECOND"]),
            (&["FIRST", "SECOND"], &["FIRST"]),
            (&["FIRST", "SECOND"], &["SECOND", "THIRD"]),
        ];
        for (enabled, disabled) in cases {
            let all: Vec<&str> = enabled.iter().chain(disabled.iter()).copied().collect();
            for (e, d) in [(enabled, disabled), (disabled, enabled)] {
                let err = classify("svc", &configs(&all), &names(e), &names(d)).unwrap_err();
                assert!(matches!(err, ValidationError::KillSwitchSetOverlap { .. }));
            }
        }

        // Overlap wins even when the shared id is not a submitted config.
        let err = classify("svc", &configs(&["a"]), &names(&["ghost"]), &names(&["ghost"]))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::KillSwitchSetOverlap {
                ids: vec!["ghost".to_string()]
            }
        );
    }

    #[test]
    fn test_every_name_gets_exactly_one_mode() {
        let all = ["d1", "d2", "e1", "e2", "x1"];
        let modes = classify("svc", &configs(&all), &names(&["e1", "e2"]), &names(&["x1"])).unwrap();

        assert_eq!(modes.len(), all.len());
        let group = |mode: Mode| -> BTreeSet<&str> {
            modes
                .iter()
                .filter(|(_, m)| **m == mode)
                .map(|(n, _)| n.as_str())
                .collect()
        };
        assert_eq!(group(Mode::DynamicConfig), BTreeSet::from(["d1", "d2"]));
        assert_eq!(group(Mode::KillSwitchEnabled), BTreeSet::from(["e1", "e2"]));
        assert_eq!(group(Mode::KillSwitchDisabled), BTreeSet::from(["x1"]));
    }

    #[test]
    fn test_missing_required_fields() {
        let bodies = [
            json!({}),
            json!({"configs": {}}),
            json!({"configs": {"CONFIG": 1000}}),
            json!({"service": ""}),
            json!({"service": "my-service"}),
            json!({"configs": {"CONFIG": 1000}, "service": ""}),
            json!({"configs": {}, "service": "my-service"}),
            json!({"configs": null, "service": "my-service"}),
        ];
        for body in bodies {
            let submission: ConfigSubmission = serde_json::from_value(body.clone()).unwrap();
            let err = submission.into_batch().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Fields 'configs' and 'service' are required",
                "body: {}",
                body
            );
        }
    }

    #[test]
    fn test_delete_request_validation() {
        let bodies = [
            json!({}),
            json!({"ids": []}),
            json!({"ids": ["ID"]}),
            json!({"service": ""}),
            json!({"service": "my-service"}),
            json!({"ids": ["ID"], "service": ""}),
            json!({"ids": [], "service": "my-service"}),
        ];
        for body in bodies {
            let request: DeleteRequest = serde_json::from_value(body).unwrap();
            let err = request.into_batch().unwrap_err();
            assert_eq!(err.to_string(), "Fields 'ids' and 'service' are required");
        }

        let request: DeleteRequest =
            serde_json::from_value(json!({"service": "svc1", "ids": ["a", "a", "b"]})).unwrap();
        let batch = request.into_batch().unwrap();
        assert_eq!(batch.names, names(&["a", "b"]));
    }

    #[test]
    fn test_batch_counts() {
        let batch = ConfigSubmission {
            service: Some("svc".to_string()),
            configs: Some(configs(&["a", "b", "c"])),
            kill_switches_enabled: Some(names(&["a"])),
            kill_switches_disabled: Some(names(&["b"])),
        }
        .into_batch()
        .unwrap();

        assert_eq!(batch.count(Mode::DynamicConfig), 1);
        assert_eq!(batch.count(Mode::KillSwitchEnabled), 1);
        assert_eq!(batch.count(Mode::KillSwitchDisabled), 1);
    }
}
