//! Property comparator: does the observed resource already satisfy the desired state?

use crate::desired::DesiredState;
use crate::path::PropertyPath;
use crate::schema::{ListOrder, Modifier, Modifiers, Policy, TextMatch};
use serde::Serialize;
use serde_json::{Map, Value};

/// One property whose observed value does not satisfy the desired value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    pub path: PropertyPath,
    pub desired: Value,
    /// `None` when the property is missing from the observed resource.
    pub observed: Option<Value>,
}

/// Whether every desired property matches the observed resource.
///
/// A `false` result is the only trigger for an update.
#[must_use]
pub fn matches(desired: &DesiredState, observed: &Value, modifiers: &Modifiers) -> bool {
    differences(desired, observed, modifiers).is_empty()
}

/// Properties of `desired` that the observed resource does not satisfy.
///
/// Immutable properties are never reported.
#[must_use]
pub fn differences(desired: &DesiredState, observed: &Value, modifiers: &Modifiers) -> Vec<Difference> {
    desired
        .iter()
        .filter_map(|(path, want)| {
            let modifier = modifiers.get(path);
            if modifier.policy == Policy::Immutable {
                return None;
            }
            let have = path.lookup(observed);
            if value_matches(want, have, modifier) {
                None
            } else {
                Some(Difference {
                    path: path.clone(),
                    desired: want.clone(),
                    observed: have.cloned(),
                })
            }
        })
        .collect()
}

/// Compare one desired value against one observed value.
///
/// `null` on the desired side means "not specified" and always matches.
/// `null` on the observed side is treated the same as a missing value.
#[must_use]
pub fn value_matches(desired: &Value, observed: Option<&Value>, modifier: Modifier) -> bool {
    if desired.is_null() {
        return true;
    }
    let Some(observed) = observed.filter(|v| !v.is_null()) else {
        return false;
    };
    match (desired, observed) {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => text_equal(a, b, modifier.text),
        (Value::Array(a), Value::Array(b)) => lists_match(a, b, modifier),
        (Value::Object(a), Value::Object(b)) => objects_match(a, b, modifier),
        _ => false,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn text_equal(a: &str, b: &str, rule: TextMatch) -> bool {
    match rule {
        TextMatch::Exact => a == b,
        TextMatch::IgnoreCase => a.eq_ignore_ascii_case(b),
        TextMatch::Location => normalize_location(a) == normalize_location(b),
    }
}

fn normalize_location(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn lists_match(desired: &[Value], observed: &[Value], modifier: Modifier) -> bool {
    if desired.len() != observed.len() {
        return false;
    }
    match modifier.list_order {
        ListOrder::Ordered => desired
            .iter()
            .zip(observed)
            .all(|(want, have)| value_matches(want, Some(have), modifier)),
        ListOrder::Unordered => {
            // Desired elements are patterns, so pairing is a bipartite matching problem.
            let candidates: Vec<Vec<usize>> = desired
                .iter()
                .map(|want| {
                    observed
                        .iter()
                        .enumerate()
                        .filter(|(_, have)| value_matches(want, Some(*have), modifier))
                        .map(|(i, _)| i)
                        .collect()
                })
                .collect();
            let mut owner = vec![None; observed.len()];
            (0..desired.len()).all(|want| {
                let mut seen = vec![false; observed.len()];
                assign(want, &candidates, &mut owner, &mut seen)
            })
        }
    }
}

/// Find an observed slot for desired element `want`, moving earlier
/// assignments along an augmenting path when that frees one.
fn assign(
    want: usize,
    candidates: &[Vec<usize>],
    owner: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for &slot in &candidates[want] {
        if seen[slot] {
            continue;
        }
        seen[slot] = true;
        let current = owner[slot];
        if current.is_none_or(|other| assign(other, candidates, owner, seen)) {
            owner[slot] = Some(want);
            return true;
        }
    }
    false
}

fn objects_match(desired: &Map<String, Value>, observed: &Map<String, Value>, modifier: Modifier) -> bool {
    let desired_ok = desired
        .iter()
        .all(|(key, want)| value_matches(want, observed.get(key), modifier));
    if !desired_ok {
        return false;
    }
    match modifier.policy {
        Policy::Exact => observed
            .iter()
            .filter(|(_, v)| !v.is_null())
            .all(|(key, _)| desired.get(key).is_some_and(|v| !v.is_null())),
        Policy::IgnoreAbsent | Policy::Immutable => true,
    }
}
