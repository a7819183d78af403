//! Upstream API paths.

use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

/// Sort order sent to the ongoing/completed listings.
const DEFAULT_ORDER: &str = "title";

/// A browsable listing of anime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Section {
    Home,
    Recent,
    Popular,
    Ongoing,
    Completed,
    Movies,
    Batches,
    Genre(String),
}

impl FromStr for Section {
    type Err = String;

    /// Parses `home`, `recent`, `popular`, `ongoing`, `completed`, `movies`,
    /// `batch` or `genre:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(genre) = s.strip_prefix("genre:") {
            let genre = genre.trim();
            if genre.is_empty() {
                return Err("genre id is required, e.g. `genre:action`".to_string());
            }
            return Ok(Section::Genre(genre.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(Section::Home),
            "recent" => Ok(Section::Recent),
            "popular" => Ok(Section::Popular),
            "ongoing" => Ok(Section::Ongoing),
            "completed" => Ok(Section::Completed),
            "movies" => Ok(Section::Movies),
            "batch" | "batches" => Ok(Section::Batches),
            other => Err(format!("unknown section `{other}`")),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Home => write!(f, "home"),
            Section::Recent => write!(f, "recent"),
            Section::Popular => write!(f, "popular"),
            Section::Ongoing => write!(f, "ongoing"),
            Section::Completed => write!(f, "completed"),
            Section::Movies => write!(f, "movies"),
            Section::Batches => write!(f, "batch"),
            Section::Genre(id) => write!(f, "genre:{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Listing { section: &'a Section, page: u32 },
    Search { query: &'a str, page: u32 },
    Genres,
    Anime(&'a str),
    Episode(&'a str),
    Server(&'a str),
    Batch(&'a str),
}

impl Endpoint<'_> {
    /// Path under the base URL for the given scraper source, e.g. `samehadaku`.
    pub fn path(&self, source: &str) -> String {
        let page = |page: &u32| (*page).max(1);
        match self {
            Endpoint::Listing { section, page: p } => match section {
                Section::Home => format!("/{source}/home"),
                Section::Recent => format!("/{source}/recent?page={}", page(p)),
                Section::Popular => format!("/{source}/popular?page={}", page(p)),
                Section::Ongoing => {
                    format!("/{source}/ongoing?page={}&order={DEFAULT_ORDER}", page(p))
                }
                Section::Completed => {
                    format!("/{source}/completed?page={}&order={DEFAULT_ORDER}", page(p))
                }
                Section::Movies => format!("/{source}/movies?page={}", page(p)),
                Section::Batches => format!("/{source}/batch?page={}", page(p)),
                Section::Genre(id) => {
                    format!("/{source}/genres/{}?page={}", encode(id), page(p))
                }
            },
            Endpoint::Search { query, page: p } => {
                format!("/{source}/search?q={}&page={}", encode(query), page(p))
            }
            Endpoint::Genres => format!("/{source}/genres"),
            Endpoint::Anime(id) => format!("/{source}/anime/{}", encode(id)),
            Endpoint::Episode(id) => format!("/{source}/episode/{}", encode(id)),
            Endpoint::Server(id) => format!("/{source}/server/{}", encode(id)),
            Endpoint::Batch(id) => format!("/{source}/batch/{}", encode(id)),
        }
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.trim().as_bytes()).collect()
}
