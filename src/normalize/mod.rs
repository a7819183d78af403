//! Field-priority coalescing from upstream JSON into canonical view models.
//!
//! Every normalizer tries an ordered list of candidate keys per target field
//! and takes the first one holding a non-empty value.

pub mod anime;
pub mod download;
pub mod envelope;
pub mod episode;
pub mod error;
pub mod stats;

use serde_json::Value;

/// Renders a scalar as a trimmed, non-empty string.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate key holding a non-empty scalar.
pub fn coalesce(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(scalar_string))
}

/// Like [`coalesce`], falling back to `default`.
pub fn coalesce_or(obj: &Value, keys: &[&str], default: &str) -> String {
    coalesce(obj, keys).unwrap_or_else(|| default.to_string())
}

/// First candidate key holding an array.
pub fn coalesce_array<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_array))
}

/// Identifier from explicit id keys, then from the trailing path segment of
/// URL-like keys.
pub fn coalesce_id(obj: &Value, id_keys: &[&str], url_keys: &[&str]) -> Option<String> {
    coalesce(obj, id_keys).or_else(|| {
        url_keys.iter().find_map(|key| {
            obj.get(*key)
                .and_then(Value::as_str)
                .and_then(last_path_segment)
                .map(str::to_string)
        })
    })
}

/// Substring after the last `/`, ignoring one trailing `/`.
///
/// `"https://x.com/anime/my-show/"` gives `"my-show"`.
pub fn last_path_segment(url: &str) -> Option<&str> {
    let url = url.trim();
    let url = url.strip_suffix('/').unwrap_or(url);
    url.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coalesce_takes_first_non_empty_candidate() {
        let obj = json!({"title": "A", "name": "B"});
        assert_eq!(coalesce(&obj, &["title", "name"]), Some("A".to_string()));

        let obj = json!({"title": "  ", "name": "B"});
        assert_eq!(coalesce(&obj, &["title", "name"]), Some("B".to_string()));

        let obj = json!({"title": null, "name": 12});
        assert_eq!(coalesce(&obj, &["title", "name"]), Some("12".to_string()));

        let obj = json!({"title": {"romaji": "A"}});
        assert_eq!(coalesce(&obj, &["title"]), None);
    }

    #[test]
    fn test_coalesce_or_default() {
        assert_eq!(coalesce_or(&json!({}), &["title"], "No Title"), "No Title");
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(
            last_path_segment("https://x.com/anime/my-show-sub-indo/"),
            Some("my-show-sub-indo")
        );
        assert_eq!(last_path_segment("/anime/naruto"), Some("naruto"));
        assert_eq!(last_path_segment("naruto"), Some("naruto"));
        assert_eq!(last_path_segment("/"), None);
        assert_eq!(last_path_segment(""), None);
    }

    #[test]
    fn test_coalesce_id_prefers_explicit_keys() {
        let obj = json!({"slug": "from-slug", "href": "/anime/from-href"});
        assert_eq!(
            coalesce_id(&obj, &["id", "slug"], &["href"]),
            Some("from-slug".to_string())
        );

        let obj = json!({"href": "/anime/from-href/"});
        assert_eq!(
            coalesce_id(&obj, &["id", "slug"], &["href"]),
            Some("from-href".to_string())
        );
    }
}
