//! Download link normalization.
//!
//! A raw download entry may be a bare URL string, an object with `url`/`link`,
//! a `host -> url` map entry, or nested under `hosts`/`servers`/`links`.
//! Everything ends up as [`DownloadLink`]s grouped by quality.

use serde::Serialize;
use serde_json::Value;

use crate::normalize::coalesce;

pub const DEFAULT_QUALITY: &str = "Default Quality";
pub const DEFAULT_HOST: &str = "Download";

const URL_KEYS: &[&str] = &["url", "link", "href"];
const HOST_KEYS: &[&str] = &["host", "name", "provider", "server", "title"];
const SIZE_KEYS: &[&str] = &["size", "filesize", "fileSize"];
const QUALITY_KEYS: &[&str] = &["quality", "resolution", "title", "name"];
const NESTED_LINK_KEYS: &[&str] = &["links", "hosts", "servers", "downloads"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub host: String,
    pub size: Option<String>,
}

/// Links sharing one quality label. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadLinkGroup {
    quality: String,
    links: Vec<DownloadLink>,
}

impl DownloadLinkGroup {
    /// Returns `None` when `links` is empty.
    pub fn new(quality: impl Into<String>, links: Vec<DownloadLink>) -> Option<Self> {
        if links.is_empty() {
            return None;
        }
        Some(Self {
            quality: quality.into(),
            links,
        })
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }

    pub fn links(&self) -> &[DownloadLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<DownloadLink> {
        self.links
    }
}

/// Hostname of `url` without a leading `www.`.
pub fn host_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn is_link_object(value: &Value) -> bool {
    value.is_object()
        && URL_KEYS
            .iter()
            .any(|key| value.get(*key).is_some_and(Value::is_string))
}

fn nested_links(value: &Value) -> Option<&Value> {
    NESTED_LINK_KEYS
        .iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_array() || v.is_object()))
}

/// Normalizes one raw entry. `key` is the map key the entry was found under,
/// which names the host for `host -> url` maps.
pub fn normalize_link(raw: &Value, key: Option<&str>) -> Vec<DownloadLink> {
    match raw {
        Value::String(url) => link(url, None, key, None).into_iter().collect(),
        Value::Object(_) if is_link_object(raw) => {
            let url = coalesce(raw, URL_KEYS).unwrap_or_default();
            let host = coalesce(raw, HOST_KEYS);
            let size = coalesce(raw, SIZE_KEYS);
            link(&url, host, key, size).into_iter().collect()
        }
        Value::Object(_) => {
            let Some(nested) = nested_links(raw) else {
                return Vec::new();
            };
            let size = coalesce(raw, SIZE_KEYS);
            let mut links = links_from(nested);
            for link in links.iter_mut().filter(|l| l.size.is_none()) {
                link.size = size.clone();
            }
            links
        }
        Value::Array(items) => items.iter().flat_map(|v| normalize_link(v, key)).collect(),
        _ => Vec::new(),
    }
}

fn link(
    url: &str,
    host: Option<String>,
    key: Option<&str>,
    size: Option<String>,
) -> Option<DownloadLink> {
    let url = url.trim();
    if url.is_empty() || url == "#" {
        return None;
    }
    let host = host
        .or_else(|| key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string))
        .or_else(|| host_from_url(url))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    Some(DownloadLink {
        url: url.to_string(),
        host,
        size,
    })
}

/// All links found in an array, a single link, or a `host -> url` map.
pub fn links_from(value: &Value) -> Vec<DownloadLink> {
    match value {
        Value::Object(map) if !is_link_object(value) && nested_links(value).is_none() => map
            .iter()
            .flat_map(|(host, v)| normalize_link(v, Some(host.as_str())))
            .collect(),
        _ => normalize_link(value, None),
    }
}

fn is_group_object(value: &Value) -> bool {
    value.is_object() && !is_link_object(value) && nested_links(value).is_some()
}

/// Groups in first-seen order, merging entries that share a quality label.
#[derive(Default)]
struct Buckets(Vec<(String, Vec<DownloadLink>)>);

impl Buckets {
    fn push(&mut self, quality: String, links: Vec<DownloadLink>) {
        match self.0.iter_mut().find(|(q, _)| *q == quality) {
            Some((_, existing)) => existing.extend(links),
            None => self.0.push((quality, links)),
        }
    }

    fn into_groups(self) -> Vec<DownloadLinkGroup> {
        self.0
            .into_iter()
            .filter_map(|(quality, links)| DownloadLinkGroup::new(quality, links))
            .collect()
    }
}

/// Normalizes any downloads-like value into link groups.
///
/// - arrays hold group objects (carrying `links`/`hosts`/...) or individual
///   links, which are bucketed by their `quality`/`resolution` field;
/// - maps whose values are arrays or non-link objects are `quality -> links`;
/// - any other map is a single [`DEFAULT_QUALITY`] group of `host -> url`.
///
/// Groups without links are dropped.
pub fn groups_from_value(value: &Value) -> Vec<DownloadLinkGroup> {
    let mut buckets = Buckets::default();

    match value {
        Value::Array(items) => {
            for item in items {
                buckets.push(quality_of(item), normalize_link(item, None));
            }
        }
        Value::Object(_) if is_group_object(value) => {
            buckets.push(quality_of(value), normalize_link(value, None));
        }
        Value::Object(map) if is_quality_map(value) => {
            for (quality, entry) in map {
                if entry.is_array() || (entry.is_object() && !is_link_object(entry)) {
                    buckets.push(quality.clone(), links_from(entry));
                } else {
                    buckets.push(
                        DEFAULT_QUALITY.to_string(),
                        normalize_link(entry, Some(quality.as_str())),
                    );
                }
            }
        }
        Value::Object(_) | Value::String(_) => {
            buckets.push(DEFAULT_QUALITY.to_string(), links_from(value));
        }
        _ => {}
    }

    buckets.into_groups()
}

/// Group objects may name their quality by `title`; on a link those keys name
/// the host instead.
fn quality_of(item: &Value) -> String {
    let keys = if is_group_object(item) {
        QUALITY_KEYS
    } else {
        &QUALITY_KEYS[..2]
    };
    coalesce(item, keys).unwrap_or_else(|| DEFAULT_QUALITY.to_string())
}

fn is_quality_map(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        !is_link_object(value)
            && map
                .values()
                .any(|v| v.is_array() || (v.is_object() && !is_link_object(v)))
    })
}
