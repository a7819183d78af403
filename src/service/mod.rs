//! Consumer-facing operations.
//!
//! Every operation fetches one upstream endpoint (the batch resolver may
//! fetch two), strips the envelope and normalizes the payload into a
//! canonical view model.

pub mod error;
pub mod invocation;

use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::batch::BatchResolver;
use crate::batch::model::BatchViewModel;
use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::endpoint::Section;
use crate::normalize::anime::AnimeDetail;
use crate::normalize::anime::AnimePage;
use crate::normalize::anime::Genre;
use crate::normalize::anime::normalize_anime_detail;
use crate::normalize::anime::normalize_anime_summaries;
use crate::normalize::anime::normalize_genres;
use crate::normalize::envelope::extract_list;
use crate::normalize::envelope::total_pages;
use crate::normalize::envelope::unwrap_envelope;
use crate::normalize::episode::EpisodeView;
use crate::normalize::episode::ServerContent;
use crate::normalize::episode::normalize_episode;
use crate::normalize::episode::normalize_server_content;
use crate::normalize::stats::ShapeStats;
use crate::service::error::ServiceError;
use crate::transport::HttpTransport;
use crate::transport::RequestOptions;
use crate::transport::Transport;
use crate::transport::error::TransportError;
use crate::transport::limiter::RequestLimiter;

/// Page size assumed when the upstream reports no page count.
const ASSUMED_PAGE_SIZE: usize = 20;

pub struct AnimeService {
    transport: Arc<dyn Transport>,
    source: String,
    batch: BatchResolver,
    stats: Arc<ShapeStats>,
}

impl AnimeService {
    pub fn new(transport: Arc<dyn Transport>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            batch: BatchResolver::new(transport.clone(), source.clone()),
            transport,
            source,
            stats: Arc::new(ShapeStats::new()),
        }
    }

    /// Builds the service over an [`HttpTransport`] configured from `config`.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.api_url)?
            .with_retry(config.retry_policy())
            .with_timeout(config.request_timeout)
            .with_limiter(RequestLimiter::new(config.min_request_interval));
        Ok(Self::new(Arc::new(transport), config.api_source.clone()))
    }

    /// Counters of upstream items dropped during normalization.
    pub fn stats(&self) -> &ShapeStats {
        &self.stats
    }

    async fn fetch(
        &self,
        endpoint: Endpoint<'_>,
        cancel: &CancellationToken,
    ) -> Result<Value, ServiceError> {
        let path = endpoint.path(&self.source);
        debug!("Fetching {path}");
        Ok(self
            .transport
            .request(&path, RequestOptions::get(cancel))
            .await?)
    }

    fn page_of(&self, raw: &Value) -> AnimePage {
        let items = normalize_anime_summaries(&extract_list(raw), &self.stats);
        let total_pages = total_pages(raw).unwrap_or_else(|| {
            u32::try_from(items.len().div_ceil(ASSUMED_PAGE_SIZE))
                .unwrap_or(u32::MAX)
                .max(1)
        });
        AnimePage { items, total_pages }
    }

    /// Lists one page of a section.
    ///
    /// # Performance
    /// * Requests: 1
    pub async fn anime_summaries(
        &self,
        section: &Section,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimePage, ServiceError> {
        let raw = self
            .fetch(Endpoint::Listing { section, page }, cancel)
            .await?;
        Ok(self.page_of(&raw))
    }

    /// # Performance
    /// * Requests: 1
    pub async fn anime_detail(
        &self,
        anime_id: &str,
        cancel: &CancellationToken,
    ) -> Result<AnimeDetail, ServiceError> {
        let anime_id = required("anime_id", anime_id)?;
        let raw = self.fetch(Endpoint::Anime(anime_id), cancel).await?;
        Ok(normalize_anime_detail(
            unwrap_envelope(&raw),
            anime_id,
            &self.stats,
        )?)
    }

    /// # Performance
    /// * Requests: 1
    pub async fn episode(
        &self,
        episode_id: &str,
        cancel: &CancellationToken,
    ) -> Result<EpisodeView, ServiceError> {
        let episode_id = required("episode_id", episode_id)?;
        let raw = self.fetch(Endpoint::Episode(episode_id), cancel).await?;
        Ok(normalize_episode(
            unwrap_envelope(&raw),
            episode_id,
            &self.stats,
        )?)
    }

    /// Resolves a server id from [`EpisodeView::servers`] to a playable URL or
    /// embed markup.
    ///
    /// # Performance
    /// * Requests: 1
    pub async fn resolve_streaming_url(
        &self,
        server_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ServerContent, ServiceError> {
        let server_id = required("server_id", server_id)?;
        let raw = self.fetch(Endpoint::Server(server_id), cancel).await?;
        Ok(normalize_server_content(unwrap_envelope(&raw))?)
    }

    /// # Performance
    /// * Requests: 1-2
    pub async fn resolve_batch_download(
        &self,
        anime_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchViewModel, ServiceError> {
        let anime_id = required("anime_id", anime_id)?;
        Ok(self.batch.resolve(anime_id, cancel).await?)
    }

    /// # Performance
    /// * Requests: 1
    pub async fn search_anime(
        &self,
        query: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<AnimePage, ServiceError> {
        let query = required("query", query)?;
        let raw = self.fetch(Endpoint::Search { query, page }, cancel).await?;
        Ok(self.page_of(&raw))
    }

    /// # Performance
    /// * Requests: 1
    pub async fn genres(&self, cancel: &CancellationToken) -> Result<Vec<Genre>, ServiceError> {
        let raw = self.fetch(Endpoint::Genres, cancel).await?;
        Ok(normalize_genres(&extract_list(&raw)))
    }
}

fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::MissingArgument { name });
    }
    Ok(value)
}
