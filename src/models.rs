//! Value types shared across the browser, drawer and adapters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dataset row: field name -> value. Identity is the value of the
/// adapter's identifier field; unique within a dataset, not across datasets.
///
/// List/search items carry top-level convenience fields plus the complete
/// source row under `record`; `field_str` checks both so rendering code does
/// not care which shape it got.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Object(map) => Some(Record(map)),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String field lookup, falling back to the nested `record` object.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        if let Some(s) = self.0.get(name).and_then(Value::as_str) {
            return Some(s);
        }
        self.0
            .get("record")
            .and_then(Value::as_object)
            .and_then(|rec| rec.get(name))
            .and_then(Value::as_str)
    }

    /// Whether a derived function already has a cached result server-side.
    pub fn ai_flag(&self, function: &str) -> bool {
        self.0
            .get("ai_status")
            .and_then(Value::as_object)
            .and_then(|m| m.get(function))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Mark one derived function as computed. Touches nothing else.
    pub fn set_ai_flag(&mut self, function: &str, value: bool) {
        let status = self
            .0
            .entry("ai_status".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(m) = status {
            m.insert(function.to_string(), Value::Bool(value));
        }
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<Record>,
    pub total: usize,
}

/// Wire envelope shared by list and search responses (`total` is only
/// guaranteed for list).
#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    pub items: Vec<Record>,
    #[serde(default)]
    pub total: Option<usize>,
}

/// Where a trigger result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Cache,
    Computed,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Cache => write!(f, "cache"),
            TriggerSource::Computed => write!(f, "computed"),
        }
    }
}

/// Response of a cache-or-compute invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub source: TriggerSource,
    pub payload: Value,
    pub created_at: String,
}

/// Full record plus whatever derived results the service already holds.
/// `None` slots mean "not computed yet".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailView {
    pub raw: Record,
    pub ai: BTreeMap<String, Option<Value>>,
}

impl DetailView {
    /// Patch exactly one function's slot; everything else stays untouched.
    pub fn patch(&mut self, function: &str, payload: Value) {
        self.ai.insert(function.to_string(), Some(payload));
    }
}

/// Provenance of a derived result the drawer has fetched this session.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedResult {
    pub function: String,
    pub source: TriggerSource,
    pub computed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        Record::from_value(json!({
            "control_id": "CTRL-100005",
            "control_title": "Access review",
            "ai_status": {"controls_taxonomy": true, "root_cause": false},
            "record": {"control_id": "CTRL-100005", "owner": "ops"}
        }))
        .unwrap()
    }

    #[test]
    fn field_lookup_falls_back_to_nested_record() {
        let r = sample();
        assert_eq!(r.field_str("control_title"), Some("Access review"));
        assert_eq!(r.field_str("owner"), Some("ops"));
        assert_eq!(r.field_str("missing"), None);
    }

    #[test]
    fn ai_flags_read_and_merge() {
        let mut r = sample();
        assert!(r.ai_flag("controls_taxonomy"));
        assert!(!r.ai_flag("root_cause"));
        assert!(!r.ai_flag("enrichment"));

        let before = r.get("control_title").cloned();
        r.set_ai_flag("root_cause", true);
        assert!(r.ai_flag("root_cause"));
        // Only the flag changed
        assert_eq!(r.get("control_title").cloned(), before);
        assert!(r.ai_flag("controls_taxonomy"));
    }

    #[test]
    fn trigger_response_parses_source() {
        let v = json!({
            "status": "ok",
            "source": "cache",
            "payload": {"theme": "IT"},
            "created_at": "2026-01-01T00:00:00Z"
        });
        let t: TriggerResponse = serde_json::from_value(v).unwrap();
        assert_eq!(t.source, TriggerSource::Cache);
        assert_eq!(t.payload["theme"], "IT");
    }

    #[test]
    fn detail_view_null_slots_become_none() {
        let v = json!({
            "raw": {"issue_id": "ISS-1"},
            "ai": {"issue_taxonomy": {"theme": "Fraud"}, "root_cause": null}
        });
        let d: DetailView = serde_json::from_value(v).unwrap();
        assert!(d.ai["issue_taxonomy"].is_some());
        assert!(d.ai["root_cause"].is_none());
    }

    #[test]
    fn patch_touches_one_slot_only() {
        let v = json!({
            "raw": {"issue_id": "ISS-1", "issue_title": "Late filing"},
            "ai": {"issue_taxonomy": {"theme": "Fraud"}, "root_cause": null}
        });
        let mut d: DetailView = serde_json::from_value(v).unwrap();
        let raw_before = d.raw.clone();
        let taxonomy_before = d.ai["issue_taxonomy"].clone();

        d.patch("root_cause", json!({"causes": ["training gap"]}));

        assert_eq!(d.raw, raw_before);
        assert_eq!(d.ai["issue_taxonomy"], taxonomy_before);
        assert_eq!(d.ai["root_cause"], Some(json!({"causes": ["training gap"]})));
    }
}
