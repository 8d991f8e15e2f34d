//! YAML frontmatter splitting and normalisation.
//!
//! A note may open with a `---` delimited YAML block. The block is always
//! removed from the body when both delimiters are present; if the YAML does
//! not parse to a mapping the note simply has no frontmatter.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::Value;

use crate::models::{Frontmatter, MetadataValue};

/// Split raw note text into parsed frontmatter and body.
pub fn split_frontmatter(raw: &str) -> (Option<Frontmatter>, String) {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw.to_string());
    };

    let Some((yaml, body)) = find_closing(rest) else {
        return (None, raw.to_string());
    };

    let body = body.trim_start_matches(['\r', '\n']).to_string();

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => (Some(normalize(map)), body),
        Ok(_) => (None, body),
        Err(e) => {
            tracing::warn!(error = %e, "frontmatter parse failed, ignoring block");
            (None, body)
        }
    }
}

/// Locate the closing delimiter; returns (yaml text, remainder after it).
fn find_closing(rest: &str) -> Option<(&str, &str)> {
    // Empty block: the closing delimiter directly follows the opening one.
    for delim in ["---\n", "---\r\n"] {
        if let Some(body) = rest.strip_prefix(delim) {
            return Some(("", body));
        }
    }
    if rest == "---" {
        return Some(("", ""));
    }

    for delim in ["\n---\n", "\n---\r\n"] {
        if let Some(i) = rest.find(delim) {
            return Some((&rest[..i], &rest[i + delim.len()..]));
        }
    }
    if let Some(yaml) = rest.strip_suffix("\n---") {
        return Some((yaml, ""));
    }
    None
}

fn normalize(map: serde_yaml::Mapping) -> Frontmatter {
    let mut fields = BTreeMap::new();

    for (key, value) in map {
        let Some(key) = scalar_to_string(&key) else {
            continue;
        };
        let converted = match key.as_str() {
            "tags" | "aliases" => to_string_list(&value),
            "created" | "modified" => to_timestamp(&value),
            _ => to_metadata(&value),
        };
        if let Some(v) = converted {
            fields.insert(key, v);
        }
    }

    Frontmatter::new(fields)
}

fn to_metadata(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Bool(b) => Some(MetadataValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(MetadataValue::Integer)
            .or_else(|| n.as_f64().map(MetadataValue::Float)),
        Value::String(s) => Some(MetadataValue::Text(s.clone())),
        Value::Sequence(_) => to_string_list(value),
        Value::Tagged(tagged) => to_metadata(&tagged.value),
        Value::Null | Value::Mapping(_) => None,
    }
}

/// A single string becomes a one-element list; nested structures are dropped.
fn to_string_list(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Sequence(items) => Some(MetadataValue::List(
            items.iter().filter_map(scalar_to_string).collect(),
        )),
        Value::String(s) => Some(MetadataValue::List(vec![s.clone()])),
        _ => None,
    }
}

/// Dates are kept as ISO-8601 text; unparseable values are dropped.
fn to_timestamp(value: &Value) -> Option<MetadataValue> {
    let raw = match value {
        Value::String(s) => s.trim(),
        _ => return None,
    };
    let normalized = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.to_rfc3339()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        d.format("%Y-%m-%d").to_string()
    } else {
        return None;
    };
    Some(MetadataValue::Text(normalized))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
