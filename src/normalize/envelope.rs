//! Envelope stripping and list extraction.
//!
//! The upstream API wraps payloads inconsistently: sometimes `{data: {...}}`,
//! sometimes `{data: {data: {...}}}`, sometimes not at all.

use serde_json::Value;

/// Strips up to two levels of `data` envelope.
///
/// Only object-valued `data` fields count as envelopes, so unwrapping an
/// already unwrapped payload returns it unchanged.
pub fn unwrap_envelope(raw: &Value) -> &Value {
    match raw.get("data") {
        Some(data) if data.is_object() => match data.get("data") {
            Some(inner) if inner.is_object() => inner,
            _ => data,
        },
        _ => raw,
    }
}

/// Finds the items of a listing response.
pub fn extract_list(raw: &Value) -> Vec<&Value> {
    if let Some(items) = raw
        .as_array()
        .or_else(|| raw.get("data").and_then(Value::as_array))
    {
        return items.iter().collect();
    }

    let payload = unwrap_envelope(raw);
    let Some(obj) = payload.as_object() else {
        return Vec::new();
    };

    // Home page: {list: [{animeList: [...]}, ...]}
    if let Some(groups) = obj.get("list").and_then(Value::as_array) {
        let items = anime_lists(groups.iter());
        if !items.is_empty() {
            return items;
        }
    }

    if let Some(items) = obj.get("animeList").and_then(Value::as_array) {
        return items.iter().collect();
    }

    if let Some(items) = obj
        .values()
        .find_map(|v| v.as_array().filter(|items| !items.is_empty()))
    {
        return items.iter().collect();
    }

    // Sections keyed by name: {recent: {animeList: [...]}, movie: {animeList: [...]}}
    let items = anime_lists(obj.values());
    if !items.is_empty() {
        return items;
    }

    if obj.contains_key("title") {
        return vec![payload];
    }

    Vec::new()
}

fn anime_lists<'a>(groups: impl Iterator<Item = &'a Value>) -> Vec<&'a Value> {
    groups
        .filter_map(|group| group.get("animeList").and_then(Value::as_array))
        .flatten()
        .collect()
}

/// Reads `pagination.totalPages` from either the envelope or the payload.
pub fn total_pages(raw: &Value) -> Option<u32> {
    [raw, unwrap_envelope(raw)]
        .into_iter()
        .filter_map(|v| v.get("pagination"))
        .find_map(|p| {
            let pages = p.get("totalPages").or_else(|| p.get("total_pages"))?;
            pages
                .as_u64()
                .or_else(|| pages.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .and_then(|pages| u32::try_from(pages).ok())
        .filter(|pages| *pages > 0)
}
