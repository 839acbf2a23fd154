//! Structural diff and patch over document values
//!
//! A patch holds an update tree shaped like the newer document plus a
//! deletion marker: a mapping entry whose value is the marker string removes
//! that key. The marker is chosen so that it never occurs as a string value
//! in the newer document.
//!
//! Sequences are diffed positionally. A sequence update always has the
//! length of the newer sequence; each position is either a nested update
//! (when both sides hold containers of the same kind) or the newer element
//! itself. Unchanged mappings inside a sequence update are left as empty `{}`
//! placeholders, which apply treats as "keep as is".
//!
//! Both sides are diffed in their wire form, with references spelled out as
//! `{"$reference": id}` mappings, so a patch means the same thing before and
//! after a trip through JSON.

use cellsnap_types::{deep_equal, Mapping, Patch, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Base of every deletion marker
pub const DELETE_MARKER: &str = "$del";

static DELETE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$del(\d*)$").expect("valid deletion marker pattern"));

/// Compute the patch that turns `current` into `next`
pub fn create_patch(current: &Value, next: &Value) -> Patch {
    let delete_marker = create_delete_marker(next);
    let current = current.to_plain();
    let next = next.to_plain();
    let updates = updates_for(Some(&current), &next, &delete_marker);
    debug!(delete_marker = %delete_marker, "patch created");

    Patch {
        updates,
        delete_marker,
    }
}

/// Apply `patch` to `current`
///
/// For any two values, `apply_patch(a, &create_patch(a, b))` equals `b`.
pub fn apply_patch(current: &Value, patch: &Patch) -> Value {
    let current = current.to_plain();
    let updates = patch.updates.to_plain();
    apply_update(Some(&current), &updates, &patch.delete_marker).canonicalize()
}

/// Returns true if applying `patch` would leave any document unchanged
pub fn is_empty_patch(patch: &Patch) -> bool {
    matches!(&patch.updates, Value::Mapping(updates) if updates.is_empty())
}

/// Pick a deletion marker that does not occur as a string value in `next`
///
/// Marker-like strings (`$del` optionally followed by digits) are collected;
/// with none present the bare marker is used, otherwise the suffix after the
/// largest one found (a bare `$del` counts as suffix 0).
pub fn create_delete_marker(next: &Value) -> String {
    let mut taken = HashSet::new();
    let mut max_suffix: Option<u64> = None;

    next.for_each_string(&mut |s| {
        if let Some(captures) = DELETE_MARKER_RE.captures(s) {
            taken.insert(s);
            let digits = &captures[1];
            let suffix = if digits.is_empty() {
                0
            } else {
                digits.parse::<u64>().unwrap_or(u64::MAX)
            };
            max_suffix = Some(max_suffix.map_or(suffix, |max| max.max(suffix)));
        }
    });

    let Some(max_suffix) = max_suffix else {
        return DELETE_MARKER.to_string();
    };

    if let Some(suffix) = max_suffix.checked_add(1) {
        return format!("{DELETE_MARKER}{suffix}");
    }

    // The largest suffix overflowed; take the first free one instead
    (1..)
        .map(|suffix: u64| format!("{DELETE_MARKER}{suffix}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| DELETE_MARKER.to_string())
}

fn updates_for(current: Option<&Value>, next: &Value, marker: &str) -> Value {
    match (current, next) {
        (Some(Value::Mapping(current)), Value::Mapping(next)) => {
            Value::Mapping(mapping_updates(current, next, marker))
        }
        (Some(Value::Sequence(current)), Value::Sequence(next)) => {
            Value::Sequence(sequence_updates(current, next, marker))
        }
        _ => next.clone(),
    }
}

fn mapping_updates(current: &Mapping, next: &Mapping, marker: &str) -> Mapping {
    let mut updates = Mapping::new();

    for (key, next_value) in next {
        match current.get(key) {
            Some(current_value) if deep_equal(current_value, next_value) => {}
            current_value => {
                updates.insert(key.clone(), updates_for(current_value, next_value, marker));
            }
        }
    }

    for key in current.keys() {
        if !next.contains_key(key) {
            updates.insert(key.clone(), Value::String(marker.to_string()));
        }
    }

    updates
}

fn sequence_updates(current: &[Value], next: &[Value], marker: &str) -> Vec<Value> {
    next.iter()
        .enumerate()
        .map(|(index, next_item)| match current.get(index) {
            Some(current_item) if same_container_kind(current_item, next_item) => {
                updates_for(Some(current_item), next_item, marker)
            }
            _ => next_item.clone(),
        })
        .collect()
}

fn same_container_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Mapping(_), Value::Mapping(_)) | (Value::Sequence(_), Value::Sequence(_))
    )
}

fn apply_update(current: Option<&Value>, update: &Value, marker: &str) -> Value {
    match (current, update) {
        (Some(Value::Mapping(current)), Value::Mapping(updates)) => {
            let mut result = current.clone();
            for (key, update) in updates {
                if update.as_str() == Some(marker) {
                    result.shift_remove(key);
                } else {
                    let value = apply_update(current.get(key), update, marker);
                    result.insert(key.clone(), value);
                }
            }
            Value::Mapping(result)
        }
        // Exactly `updates.len()` elements, so a shrunk sequence stays shrunk
        (Some(Value::Sequence(current)), Value::Sequence(updates)) => Value::Sequence(
            updates
                .iter()
                .enumerate()
                .map(|(index, update)| apply_update(current.get(index), update, marker))
                .collect(),
        ),
        _ => update.clone(),
    }
}
