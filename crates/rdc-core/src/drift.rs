//! Drift Detector (C6): a subset-directional structural comparison between
//! the declared spec and the observed remote body.
//!
//! "Subset-directional" means the remote may carry extra fields the spec
//! never mentioned — those are ignored entirely. Only keys the spec
//! actually declares are checked, and only against the corresponding
//! remote key when the remote has it at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::render_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftKind {
    /// The spec and remote values are of fundamentally different JSON
    /// kinds (or, for arrays, the remote is shorter than the spec).
    TypesDiffer,
    /// Same kind, different scalar value.
    ValueDiffers,
}

/// The first differing path found during a `compare`, with both sides'
/// string renderings for operator debugging (`spec.md` §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReason {
    pub path: String,
    pub lhs: String,
    pub rhs: String,
    pub kind: DriftKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftOutcome {
    Equal,
    NotEqual(DriftReason),
}

impl DriftOutcome {
    pub fn is_equal(&self) -> bool {
        matches!(self, DriftOutcome::Equal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

fn kind_of(v: &Value) -> JsonKind {
    match v {
        Value::Object(_) => JsonKind::Object,
        Value::Array(_) => JsonKind::Array,
        Value::String(_) => JsonKind::String,
        Value::Number(_) => JsonKind::Number,
        Value::Bool(_) => JsonKind::Bool,
        Value::Null => JsonKind::Null,
    }
}

/// Numbers widen to a 64-bit signed integer via truncation before
/// comparison — floats lose their fractional part. This loses information
/// on purpose: remote APIs routinely hand integers back as floats after
/// JSON decoding, and matching drift verdicts against that noise requires
/// the same widening every time a number crosses this boundary.
fn truncate_to_i64(n: &serde_json::Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if let Some(u) = n.as_u64() {
        u as i64
    } else {
        n.as_f64().unwrap_or(0.0).trunc() as i64
    }
}

fn scalar_equal(sv: &Value, rv: &Value) -> bool {
    match (sv, rv) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => truncate_to_i64(a) == truncate_to_i64(b),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => sv == rv,
    }
}

fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}

fn compare_at(spec: &Value, remote: &Value, path: &str) -> Option<DriftReason> {
    let spec_kind = kind_of(spec);
    let remote_kind = kind_of(remote);

    if spec_kind != remote_kind {
        return Some(DriftReason {
            path: path.to_string(),
            lhs: render_value(spec),
            rhs: render_value(remote),
            kind: DriftKind::TypesDiffer,
        });
    }

    match spec_kind {
        JsonKind::Object => {
            let spec_obj = spec.as_object().expect("kind checked");
            let remote_obj = remote.as_object().expect("kind checked");
            for (k, sv) in spec_obj {
                let Some(rv) = remote_obj.get(k) else {
                    continue;
                };
                if let Some(reason) = compare_at(sv, rv, &join_path(path, k)) {
                    return Some(reason);
                }
            }
            None
        }
        JsonKind::Array => {
            let spec_arr = spec.as_array().expect("kind checked");
            let remote_arr = remote.as_array().expect("kind checked");
            for (i, sv) in spec_arr.iter().enumerate() {
                let index_path = format!("{path}[{i}]");
                let Some(rv) = remote_arr.get(i) else {
                    return Some(DriftReason {
                        path: index_path,
                        lhs: render_value(sv),
                        rhs: "<missing>".to_string(),
                        kind: DriftKind::TypesDiffer,
                    });
                };
                if let Some(reason) = compare_at(sv, rv, &index_path) {
                    return Some(reason);
                }
            }
            None
        }
        _ => {
            if scalar_equal(spec, remote) {
                None
            } else {
                Some(DriftReason {
                    path: path.to_string(),
                    lhs: render_value(spec),
                    rhs: render_value(remote),
                    kind: DriftKind::ValueDiffers,
                })
            }
        }
    }
}

/// Compare `spec` against `remote`. Both must be JSON objects at the top
/// level — everything nested is walked depth-first, field-driven by
/// `spec`'s own keys.
pub fn compare(spec: &Value, remote: &Value) -> DriftOutcome {
    match compare_at(spec, remote, "") {
        Some(reason) => DriftOutcome::NotEqual(reason),
        None => DriftOutcome::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_when_remote_is_a_superset() {
        let spec = json!({"name": "w1"});
        let remote = json!({"name": "w1", "id": "W-1"});
        assert!(compare(&spec, &remote).is_equal());
    }

    #[test]
    fn numeric_widening_tolerates_float_vs_int() {
        assert!(compare(&json!({"x": 1}), &json!({"x": 1.0})).is_equal());
        assert!(compare(&json!({"x": 42}), &json!({"x": 42.4})).is_equal());
        assert!(!compare(&json!({"x": 1}), &json!({"x": 2})).is_equal());
    }

    #[test]
    fn missing_remote_key_is_not_drift() {
        let spec = json!({"name": "w1", "extra": "x"});
        let remote = json!({"name": "w1"});
        assert!(compare(&spec, &remote).is_equal());
    }

    #[test]
    fn reports_first_differing_path() {
        let spec = json!({"name": "w1", "description": "d-new"});
        let remote = json!({"name": "w1", "description": "d"});
        match compare(&spec, &remote) {
            DriftOutcome::NotEqual(reason) => {
                assert_eq!(reason.path, "description");
                assert_eq!(reason.lhs, "d-new");
                assert_eq!(reason.rhs, "d");
            }
            DriftOutcome::Equal => panic!("expected drift"),
        }
    }

    #[test]
    fn nested_objects_recurse() {
        let spec = json!({"meta": {"region": "us"}});
        let remote = json!({"meta": {"region": "eu"}});
        match compare(&spec, &remote) {
            DriftOutcome::NotEqual(reason) => assert_eq!(reason.path, "meta.region"),
            DriftOutcome::Equal => panic!("expected drift"),
        }
    }

    #[test]
    fn array_index_out_of_range_is_types_differ() {
        let spec = json!({"tags": ["a", "b"]});
        let remote = json!({"tags": ["a"]});
        match compare(&spec, &remote) {
            DriftOutcome::NotEqual(reason) => {
                assert_eq!(reason.path, "tags[1]");
                assert_eq!(reason.kind, DriftKind::TypesDiffer);
            }
            DriftOutcome::Equal => panic!("expected drift"),
        }
    }

    #[test]
    fn type_mismatch_is_types_differ() {
        let spec = json!({"count": 5});
        let remote = json!({"count": "5"});
        match compare(&spec, &remote) {
            DriftOutcome::NotEqual(reason) => assert_eq!(reason.kind, DriftKind::TypesDiffer),
            DriftOutcome::Equal => panic!("expected drift"),
        }
    }
}
