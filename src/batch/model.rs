use serde::Serialize;
use serde::ser::SerializeStruct;

use crate::normalize::download::DownloadLinkGroup;

pub const DEFAULT_BATCH_TITLE: &str = "Batch Download";
pub const MESSAGE_EPISODES_ONLY: &str =
    "Batch download is not available, but individual episodes can be downloaded.";
pub const MESSAGE_NOT_FOUND: &str = "Batch download is not available for this anime.";

/// Strategy that produced the download links of a [`BatchViewModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSource {
    BatchEndpoint,
    EmbeddedBatch,
    DownloadsMap,
    EpisodeDownloads,
}

/// Canonical batch-download result.
///
/// Availability is not stored; [`BatchViewModel::batch_available`] derives it
/// from the download links each time it is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchViewModel {
    title: String,
    poster: String,
    download_links: Vec<DownloadLinkGroup>,
    message: Option<String>,
    source: Option<BatchSource>,
    has_episodes: bool,
}

impl BatchViewModel {
    pub fn available(
        title: String,
        poster: String,
        download_links: Vec<DownloadLinkGroup>,
        source: BatchSource,
    ) -> Self {
        Self {
            title,
            poster,
            download_links,
            message: None,
            source: Some(source),
            has_episodes: false,
        }
    }

    pub fn unavailable(title: String, poster: String, message: String, has_episodes: bool) -> Self {
        Self {
            title,
            poster,
            download_links: Vec::new(),
            message: Some(message),
            source: None,
            has_episodes,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn poster(&self) -> &str {
        &self.poster
    }

    pub fn download_links(&self) -> &[DownloadLinkGroup] {
        &self.download_links
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn source(&self) -> Option<BatchSource> {
        self.source
    }

    pub fn has_episodes(&self) -> bool {
        self.has_episodes
    }

    pub fn batch_available(&self) -> bool {
        self.download_links.iter().any(|g| !g.links().is_empty())
    }
}

impl Serialize for BatchViewModel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("BatchViewModel", 7)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("poster", &self.poster)?;
        state.serialize_field("downloadLinks", &self.download_links)?;
        state.serialize_field("batchAvailable", &self.batch_available())?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("hasEpisodes", &self.has_episodes)?;
        state.end()
    }
}
