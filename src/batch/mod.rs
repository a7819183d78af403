//! Batch-download resolution.
//!
//! A fixed cascade of strategies is tried strictly in order; the first one
//! producing at least one non-empty [`DownloadLinkGroup`] wins:
//!
//! 1. the dedicated batch endpoint,
//! 2. a `batch` object embedded in the anime detail,
//! 3. an anime-level downloads map in the detail,
//! 4. per-episode downloads in the detail, one group per episode.
//!
//! The anime detail is fetched at most once, when step 2 is reached, and
//! shared by the later steps.

pub mod error;
pub mod model;

use std::sync::Arc;

use log::debug;
use log::info;
use log::warn;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::batch::error::BatchError;
use crate::batch::model::BatchSource;
use crate::batch::model::BatchViewModel;
use crate::batch::model::DEFAULT_BATCH_TITLE;
use crate::batch::model::MESSAGE_EPISODES_ONLY;
use crate::batch::model::MESSAGE_NOT_FOUND;
use crate::endpoint::Endpoint;
use crate::normalize::coalesce;
use crate::normalize::coalesce_array;
use crate::normalize::download::DownloadLinkGroup;
use crate::normalize::download::groups_from_value;
use crate::normalize::envelope::unwrap_envelope;
use crate::normalize::episode::EPISODE_DOWNLOAD_KEYS;
use crate::normalize::episode::EPISODE_LIST_KEYS;
use crate::normalize::scalar_string;
use crate::transport::RequestOptions;
use crate::transport::Transport;
use crate::transport::error::TransportError;

const GROUP_ARRAY_KEYS: &[&str] = &["downloadLinks", "download_links"];
const EMBEDDED_LINK_KEYS: &[&str] = &["links", "downloads"];
const DOWNLOADS_MAP_KEYS: &[&str] = &["downloads", "batch_links", "downloadBatch", "batchLinks"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const POSTER_KEYS: &[&str] = &["poster", "thumbnail", "image"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    TryPrimaryEndpoint,
    TryEmbeddedBatchInDetail,
    TryDownloadsMapInDetail,
    TryPerEpisodeAggregation,
    Unavailable,
}

impl BatchState {
    /// State reached when this one yields no links. `Unavailable` is terminal.
    pub fn next(self) -> Self {
        match self {
            BatchState::TryPrimaryEndpoint => BatchState::TryEmbeddedBatchInDetail,
            BatchState::TryEmbeddedBatchInDetail => BatchState::TryDownloadsMapInDetail,
            BatchState::TryDownloadsMapInDetail => BatchState::TryPerEpisodeAggregation,
            BatchState::TryPerEpisodeAggregation | BatchState::Unavailable => {
                BatchState::Unavailable
            }
        }
    }
}

/// Links found by one strategy, with the metadata of the payload they came from.
#[derive(Debug)]
struct Found {
    groups: Vec<DownloadLinkGroup>,
    source: BatchSource,
    title: Option<String>,
    poster: Option<String>,
}

impl Found {
    fn new(groups: Vec<DownloadLinkGroup>, source: BatchSource, payload: &Value) -> Option<Self> {
        if groups.is_empty() {
            return None;
        }
        Some(Self {
            groups,
            source,
            title: coalesce(payload, TITLE_KEYS),
            poster: coalesce(payload, POSTER_KEYS),
        })
    }
}

pub struct BatchResolver {
    transport: Arc<dyn Transport>,
    source: String,
}

impl BatchResolver {
    pub fn new(transport: Arc<dyn Transport>, source: impl Into<String>) -> Self {
        Self {
            transport,
            source: source.into(),
        }
    }

    /// Runs the cascade for `anime_id`.
    ///
    /// Only fails when cancelled, or when both the batch endpoint and the
    /// anime detail are unreachable. "No links anywhere" is an unavailable
    /// [`BatchViewModel`], not an error.
    pub async fn resolve(
        &self,
        anime_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchViewModel, BatchError> {
        let mut run = Resolution {
            transport: self.transport.as_ref(),
            source: &self.source,
            anime_id,
            cancel,
            primary_error: None,
            upstream_message: None,
            detail: None,
        };

        let mut state = BatchState::TryPrimaryEndpoint;
        loop {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled);
            }
            debug!("Batch {anime_id}: {state:?}");

            let found = match state {
                BatchState::TryPrimaryEndpoint => run.try_primary().await?,
                BatchState::TryEmbeddedBatchInDetail => {
                    run.detail().await?.and_then(embedded_batch)
                }
                BatchState::TryDownloadsMapInDetail => {
                    run.detail().await?.and_then(downloads_map)
                }
                BatchState::TryPerEpisodeAggregation => {
                    run.detail().await?.and_then(episode_downloads)
                }
                BatchState::Unavailable => return run.unavailable(),
            };

            if let Some(found) = found {
                info!(
                    "Batch {anime_id}: {} link group(s) from {:?}",
                    found.groups.len(),
                    found.source
                );
                return Ok(run.available(found));
            }
            state = state.next();
        }
    }
}

/// State of a single [`BatchResolver::resolve`] call.
struct Resolution<'a> {
    transport: &'a dyn Transport,
    source: &'a str,
    anime_id: &'a str,
    cancel: &'a CancellationToken,
    primary_error: Option<TransportError>,
    /// `message` of an upstream payload flagged `ok: false`.
    upstream_message: Option<String>,
    /// Raw detail response; `None` until first needed.
    detail: Option<Result<Value, TransportError>>,
}

impl Resolution<'_> {
    /// Outer error only for cancellation; transport failures are returned
    /// inside so the cascade can move on.
    async fn fetch(
        &mut self,
        endpoint: Endpoint<'_>,
    ) -> Result<Result<Value, TransportError>, BatchError> {
        let path = endpoint.path(self.source);
        match self
            .transport
            .request(&path, RequestOptions::get(self.cancel))
            .await
        {
            Err(e) if e.is_cancelled() => Err(BatchError::Cancelled),
            Err(e) => Ok(Err(e)),
            Ok(raw) => {
                if raw.get("ok").and_then(Value::as_bool) == Some(false)
                    && let Some(message) = coalesce(&raw, &["message"])
                {
                    self.upstream_message = Some(message);
                }
                Ok(Ok(raw))
            }
        }
    }

    async fn try_primary(&mut self) -> Result<Option<Found>, BatchError> {
        match self.fetch(Endpoint::Batch(self.anime_id)).await? {
            Ok(raw) => Ok(primary_batch(&raw)),
            Err(e) => {
                warn!("Batch endpoint failed for {}: {e}", self.anime_id);
                self.primary_error = Some(e);
                Ok(None)
            }
        }
    }

    async fn detail(&mut self) -> Result<Option<&Value>, BatchError> {
        if self.detail.is_none() {
            let fetched = self.fetch(Endpoint::Anime(self.anime_id)).await?;
            if let Err(e) = &fetched {
                warn!("Anime detail failed for {}: {e}", self.anime_id);
            }
            self.detail = Some(fetched);
        }
        Ok(self.detail_payload())
    }

    fn detail_payload(&self) -> Option<&Value> {
        match &self.detail {
            Some(Ok(raw)) => Some(unwrap_envelope(raw)),
            _ => None,
        }
    }

    fn available(&self, found: Found) -> BatchViewModel {
        let detail = self.detail_payload();
        let title = found
            .title
            .or_else(|| detail.and_then(|d| coalesce(d, TITLE_KEYS)))
            .unwrap_or_else(|| DEFAULT_BATCH_TITLE.to_string());
        let poster = found
            .poster
            .or_else(|| detail.and_then(|d| coalesce(d, POSTER_KEYS)))
            .unwrap_or_default();
        BatchViewModel::available(title, poster, found.groups, found.source)
    }

    fn unavailable(&mut self) -> Result<BatchViewModel, BatchError> {
        if self.primary_error.is_some()
            && matches!(self.detail, Some(Err(_)))
            && let (Some(primary), Some(Err(detail))) =
                (self.primary_error.take(), self.detail.take())
        {
            return Err(BatchError::Transport { primary, detail });
        }

        let detail = self.detail_payload();
        let has_episodes = detail
            .and_then(|d| coalesce_array(d, EPISODE_LIST_KEYS))
            .is_some_and(|episodes| !episodes.is_empty());
        let message = if has_episodes {
            MESSAGE_EPISODES_ONLY.to_string()
        } else {
            self.upstream_message
                .clone()
                .unwrap_or_else(|| MESSAGE_NOT_FOUND.to_string())
        };
        let title = detail
            .and_then(|d| coalesce(d, TITLE_KEYS))
            .unwrap_or_else(|| DEFAULT_BATCH_TITLE.to_string());
        let poster = detail
            .and_then(|d| coalesce(d, POSTER_KEYS))
            .unwrap_or_default();

        info!("Batch {}: unavailable ({message})", self.anime_id);
        Ok(BatchViewModel::unavailable(title, poster, message, has_episodes))
    }
}

/// Group arrays under `downloadLinks`/`download_links`.
fn link_groups(payload: &Value) -> Vec<DownloadLinkGroup> {
    GROUP_ARRAY_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .map(groups_from_value)
        .find(|groups| !groups.is_empty())
        .unwrap_or_default()
}

/// Links of a `batch` object: its group array, else its `links`/`downloads`
/// read as a downloads map.
fn batch_object_groups(batch: &Value) -> Vec<DownloadLinkGroup> {
    let groups = link_groups(batch);
    if !groups.is_empty() {
        return groups;
    }
    EMBEDDED_LINK_KEYS
        .iter()
        .filter_map(|key| batch.get(*key))
        .map(groups_from_value)
        .find(|groups| !groups.is_empty())
        .unwrap_or_default()
}

fn primary_batch(raw: &Value) -> Option<Found> {
    let payload = match raw.get("data") {
        Some(data) if data.is_array() => data,
        _ => unwrap_envelope(raw),
    };

    if let Some(items) = payload.as_array() {
        let first = items.first()?;
        return Found::new(groups_from_value(payload), BatchSource::BatchEndpoint, first);
    }

    let groups = link_groups(payload);
    if !groups.is_empty() {
        return Found::new(groups, BatchSource::BatchEndpoint, payload);
    }

    let batch = payload.get("batch").filter(|b| b.is_object())?;
    let mut found = Found::new(batch_object_groups(batch), BatchSource::BatchEndpoint, batch)?;
    found.title = coalesce(payload, TITLE_KEYS).or(found.title);
    found.poster = coalesce(payload, POSTER_KEYS).or(found.poster);
    Some(found)
}

fn embedded_batch(detail: &Value) -> Option<Found> {
    let batch = detail.get("batch").filter(|b| b.is_object())?;
    let mut found = Found::new(batch_object_groups(batch), BatchSource::EmbeddedBatch, batch)?;
    found.title = coalesce(detail, TITLE_KEYS).or(found.title);
    found.poster = coalesce(detail, POSTER_KEYS).or(found.poster);
    Some(found)
}

fn downloads_map(detail: &Value) -> Option<Found> {
    let groups = DOWNLOADS_MAP_KEYS
        .iter()
        .filter_map(|key| detail.get(*key))
        .map(groups_from_value)
        .find(|groups| !groups.is_empty())?;
    Found::new(groups, BatchSource::DownloadsMap, detail)
}

fn episode_downloads(detail: &Value) -> Option<Found> {
    let episodes = coalesce_array(detail, EPISODE_LIST_KEYS)?;
    let groups = episodes
        .iter()
        .filter_map(|episode| {
            let downloads = EPISODE_DOWNLOAD_KEYS
                .iter()
                .find_map(|key| episode.get(*key).filter(|v| !v.is_null()))?;
            let links = groups_from_value(downloads)
                .into_iter()
                .flat_map(DownloadLinkGroup::into_links)
                .collect();
            DownloadLinkGroup::new(episode_label(episode), links)
        })
        .collect();
    Found::new(groups, BatchSource::EpisodeDownloads, detail)
}

/// `Episode N`, N from the `episode` field or the first number in the title.
fn episode_label(episode: &Value) -> String {
    let title = coalesce(episode, &["title"]);
    let number = episode
        .get("episode")
        .and_then(scalar_string)
        .or_else(|| title.as_deref().and_then(first_number).map(str::to_string));
    match (number, title) {
        (Some(number), _) => format!("Episode {number}"),
        (None, Some(title)) => title,
        (None, None) => "Episode".to_string(),
    }
}

fn first_number(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}
