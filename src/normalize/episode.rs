//! Episodes, streaming servers and resolved streaming content.

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::normalize::coalesce;
use crate::normalize::coalesce_array;
use crate::normalize::coalesce_id;
use crate::normalize::download::DownloadLinkGroup;
use crate::normalize::download::groups_from_value;
use crate::normalize::error::ShapeError;
use crate::normalize::stats::ShapeStats;

const EPISODE_ID_KEYS: &[&str] = &["episodeId", "id", "slug"];
const URL_ID_KEYS: &[&str] = &["href", "link"];
pub(crate) const EPISODE_LIST_KEYS: &[&str] = &["episodes", "episode_list", "episodeList"];
pub(crate) const EPISODE_DOWNLOAD_KEYS: &[&str] = &["downloads", "download_links", "downloadLinks"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EpisodeRef {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerOption {
    pub id: String,
    pub name: String,
    /// Directly playable URL, when the upstream already gave one.
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeView {
    pub episode: EpisodeRef,
    pub anime_id: Option<String>,
    pub servers: Vec<ServerOption>,
    pub downloads: Vec<DownloadLinkGroup>,
}

/// What a streaming server resolved to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ServerContent {
    /// A URL to load in a player frame.
    Url(String),
    /// Raw `<iframe>`/`<script>` markup. Must only be rendered sandboxed.
    EmbedMarkup(String),
}

impl ServerContent {
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("<iframe") || lower.contains("<script") {
            ServerContent::EmbedMarkup(raw.to_string())
        } else {
            ServerContent::Url(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServerContent::Url(s) | ServerContent::EmbedMarkup(s) => s,
        }
    }
}

/// Normalizes a raw episode list. Items without an identifier cannot be linked
/// to and are dropped; missing titles become `Episode <n>`.
pub fn normalize_episode_list(items: &[Value], stats: &ShapeStats) -> Vec<EpisodeRef> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let Some(id) = coalesce_id(item, EPISODE_ID_KEYS, URL_ID_KEYS) else {
                warn!("Dropping episode #{} without an identifier", index + 1);
                stats.record_dropped_episode();
                return None;
            };
            let title = coalesce(item, &["title", "name"])
                .unwrap_or_else(|| format!("Episode {}", index + 1));
            Some(EpisodeRef { id, title })
        })
        .collect()
}

/// Episodes of an anime detail payload, `[]` when absent or not an array.
pub fn episodes_of(detail: &Value, stats: &ShapeStats) -> Vec<EpisodeRef> {
    coalesce_array(detail, EPISODE_LIST_KEYS)
        .map(|items| normalize_episode_list(items, stats))
        .unwrap_or_default()
}

fn normalize_servers(items: &[Value], stats: &ShapeStats) -> Vec<ServerOption> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let url = coalesce(item, &["url", "embed_url", "embedUrl"]);
            let id = coalesce_id(item, &["serverId", "id", "stream_id", "value"], &["href"])
                .or_else(|| url.as_ref().map(|_| format!("server-{}", index + 1)));
            let Some(id) = id else {
                warn!("Dropping server #{} without an identifier or url", index + 1);
                stats.record_dropped_server();
                return None;
            };
            let name = coalesce(item, &["name", "title"])
                .unwrap_or_else(|| format!("Server {}", index + 1));
            Some(ServerOption { id, name, url })
        })
        .collect()
}

/// Servers grouped by quality: `{server: {qualities: [{title, serverList}]}}`.
fn quality_servers(raw: &Value) -> Vec<Value> {
    raw.get("server")
        .and_then(|server| server.get("qualities"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|quality| quality.get("serverList").and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect()
}

/// Normalizes an unwrapped episode payload.
///
/// `requested_id` fills in the episode id when the payload omits it.
pub fn normalize_episode(
    raw: &Value,
    requested_id: &str,
    stats: &ShapeStats,
) -> Result<EpisodeView, ShapeError> {
    if !raw.is_object() {
        return Err(ShapeError::NotAnObject { entity: "episode" });
    }

    let id = coalesce_id(raw, EPISODE_ID_KEYS, URL_ID_KEYS)
        .or_else(|| Some(requested_id.trim().to_string()).filter(|id| !id.is_empty()))
        .ok_or(ShapeError::MissingField {
            entity: "episode",
            field: "id",
        })?;
    let title = coalesce(raw, &["title", "name"]).unwrap_or_else(|| {
        let number = id.rsplit('-').next().unwrap_or(id.as_str());
        format!("Episode {number}")
    });

    let anime_id = coalesce(raw, &["animeId", "anime_id"]).or_else(|| {
        raw.get("anime")
            .and_then(|anime| coalesce_id(anime, &["animeId", "id", "slug"], URL_ID_KEYS))
    });

    let mut servers = match coalesce_array(raw, &["servers", "serverList", "server_list"]) {
        Some(items) => normalize_servers(items, stats),
        None => normalize_servers(&quality_servers(raw), stats),
    };
    if servers.is_empty()
        && let Some(url) = coalesce(raw, &["videoUrl", "video_url", "defaultStreamingUrl"])
    {
        servers.push(ServerOption {
            id: "default".to_string(),
            name: "Default Source".to_string(),
            url: Some(url),
        });
    }

    let downloads = EPISODE_DOWNLOAD_KEYS
        .iter()
        .find_map(|key| raw.get(*key))
        .map(groups_from_value)
        .unwrap_or_default();

    Ok(EpisodeView {
        episode: EpisodeRef { id, title },
        anime_id,
        servers,
        downloads,
    })
}

/// Normalizes an unwrapped streaming-server payload.
pub fn normalize_server_content(raw: &Value) -> Result<ServerContent, ShapeError> {
    if let Some(raw) = raw.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(ServerContent::classify(raw));
    }
    coalesce(
        raw,
        &["url", "videoUrl", "streamingUrl", "link", "embed", "iframe", "embedUrl"],
    )
        .map(|raw| ServerContent::classify(&raw))
        .ok_or(ShapeError::MissingField {
            entity: "streaming server",
            field: "url",
        })
}
