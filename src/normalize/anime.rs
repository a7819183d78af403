//! Anime summaries, details and genres.

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::normalize::coalesce;
use crate::normalize::coalesce_id;
use crate::normalize::coalesce_or;
use crate::normalize::episode::EpisodeRef;
use crate::normalize::episode::episodes_of;
use crate::normalize::error::ShapeError;
use crate::normalize::scalar_string;
use crate::normalize::stats::ShapeStats;

pub const DEFAULT_TITLE: &str = "No Title";
pub const PLACEHOLDER_THUMBNAIL: &str = "/placeholder-anime.jpg";
pub const DEFAULT_MEDIA_TYPE: &str = "TV";
pub const DEFAULT_STATUS: &str = "Unknown";

const ANIME_ID_KEYS: &[&str] = &["animeId", "id", "slug"];
const URL_ID_KEYS: &[&str] = &["href", "link"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const THUMBNAIL_KEYS: &[&str] = &["image", "thumbnail", "poster", "img"];
const EPISODE_LABEL_KEYS: &[&str] = &["episodeNumber", "episode", "episodes"];
const MEDIA_TYPE_KEYS: &[&str] = &["type", "category"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeSummary {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub episode_label: Option<String>,
    pub media_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetail {
    #[serde(flatten)]
    pub summary: AnimeSummary,
    pub alternative_title: Option<String>,
    pub synopsis: String,
    pub genres: Vec<String>,
    pub status: String,
    pub score: Option<String>,
    pub studio: Option<String>,
    pub release_date: Option<String>,
    pub episodes: Vec<EpisodeRef>,
}

/// One page of a listing or search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimePage {
    pub items: Vec<AnimeSummary>,
    pub total_pages: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Genre {
    pub id: String,
    pub title: String,
}

/// Normalizes one listing item.
///
/// Items with no derivable id are rejected rather than given a made-up one,
/// since the id is what consumers link to.
pub fn normalize_anime_summary(raw: &Value) -> Result<AnimeSummary, ShapeError> {
    if !raw.is_object() {
        return Err(ShapeError::NotAnObject { entity: "anime" });
    }
    let id = coalesce_id(raw, ANIME_ID_KEYS, URL_ID_KEYS).ok_or(ShapeError::MissingField {
        entity: "anime",
        field: "id",
    })?;
    Ok(summary_with_id(raw, id, THUMBNAIL_KEYS))
}

fn summary_with_id(raw: &Value, id: String, thumbnail_keys: &[&str]) -> AnimeSummary {
    AnimeSummary {
        id,
        title: coalesce_or(raw, TITLE_KEYS, DEFAULT_TITLE),
        thumbnail_url: coalesce_or(raw, thumbnail_keys, PLACEHOLDER_THUMBNAIL),
        episode_label: coalesce(raw, EPISODE_LABEL_KEYS),
        media_type: coalesce_or(raw, MEDIA_TYPE_KEYS, DEFAULT_MEDIA_TYPE),
    }
}

/// Normalizes listing items, dropping and counting the ones that fail.
pub fn normalize_anime_summaries(items: &[&Value], stats: &ShapeStats) -> Vec<AnimeSummary> {
    items
        .iter()
        .filter_map(|raw| match normalize_anime_summary(raw) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Dropping anime summary: {e}");
                stats.record_dropped_summary();
                None
            }
        })
        .collect()
}

/// Normalizes an unwrapped anime detail payload.
///
/// `requested_id` is used when the payload does not carry its own id.
pub fn normalize_anime_detail(
    raw: &Value,
    requested_id: &str,
    stats: &ShapeStats,
) -> Result<AnimeDetail, ShapeError> {
    if !raw.is_object() {
        return Err(ShapeError::NotAnObject {
            entity: "anime detail",
        });
    }
    let id = coalesce_id(raw, ANIME_ID_KEYS, URL_ID_KEYS)
        .or_else(|| Some(requested_id.trim().to_string()).filter(|id| !id.is_empty()))
        .ok_or(ShapeError::MissingField {
            entity: "anime detail",
            field: "id",
        })?;

    // Detail pages carry a large poster, listings a thumbnail.
    let summary = summary_with_id(raw, id, &["poster", "image", "thumbnail", "img"]);

    Ok(AnimeDetail {
        summary,
        alternative_title: coalesce(raw, &["japanese", "english", "synonyms", "alternativeTitle"]),
        synopsis: synopsis_of(raw),
        genres: genres_of(raw),
        status: coalesce_or(raw, &["status"], DEFAULT_STATUS),
        score: score_of(raw),
        studio: coalesce(raw, &["studios", "studio"]),
        release_date: coalesce(raw, &["aired", "releaseDate", "released"]),
        episodes: episodes_of(raw, stats),
    })
}

fn synopsis_of(raw: &Value) -> String {
    let Some(value) = ["synopsis", "description", "sinopsis"]
        .iter()
        .find_map(|key| raw.get(*key).filter(|v| !v.is_null()))
    else {
        return String::new();
    };
    if let Some(text) = scalar_string(value) {
        return text;
    }
    // {paragraphs: ["...", "..."]}
    value
        .get("paragraphs")
        .and_then(Value::as_array)
        .map(|paragraphs| {
            paragraphs
                .iter()
                .filter_map(scalar_string)
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .unwrap_or_default()
}

fn genres_of(raw: &Value) -> Vec<String> {
    let Some(items) = ["genres", "genreList", "genre"]
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|genre| scalar_string(genre).or_else(|| coalesce(genre, TITLE_KEYS)))
        .collect()
}

fn score_of(raw: &Value) -> Option<String> {
    match raw.get("score") {
        Some(score @ Value::Object(_)) => coalesce(score, &["value"]),
        Some(score) => scalar_string(score),
        None => coalesce(raw, &["rating"]),
    }
}

/// Normalizes the genre listing. Genres without an id are skipped.
pub fn normalize_genres(items: &[&Value]) -> Vec<Genre> {
    items
        .iter()
        .filter_map(|raw| {
            let id = coalesce_id(raw, &["genreId", "id", "slug"], URL_ID_KEYS)?;
            let title = coalesce(raw, TITLE_KEYS).unwrap_or_else(|| id.clone());
            Some(Genre { id, title })
        })
        .collect()
}
