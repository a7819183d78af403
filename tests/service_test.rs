//! Tests for the anime service against mock servers.

mod common;

use animek::endpoint::Section;
use animek::normalize::episode::ServerContent;
use animek::service::error::ServiceError;
use animek::service::invocation::InvocationTracker;
use httpmock::Method::GET;
use httpmock::MockServer;
use tokio_util::sync::CancellationToken;

use crate::common::get_response;
use crate::common::service;

fn json_mock<'a>(server: &'a MockServer, path: &str, file: &str) -> httpmock::Mock<'a> {
    let body = get_response(file);
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

#[tokio::test]
async fn test_home_sections_are_flattened() {
    let server = MockServer::start();
    let mock = json_mock(&server, "/samehadaku/home", "home.json");
    let service = service(&server);

    let page = service
        .anime_summaries(&Section::Home, 1, &CancellationToken::new())
        .await
        .expect("Failed to list home");

    mock.assert();
    let ids: Vec<&str> = page.items.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "chainsaw-man-movie-reze-hen",
            "sousou-no-frieren-season-2",
            "kusuriya-no-hitorigoto-season-3",
        ]
    );
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.items[1].episode_label.as_deref(), Some("3"));
    assert_eq!(service.stats().dropped_summaries(), 1);
}

#[tokio::test]
async fn test_listing_query_params() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/samehadaku/ongoing")
            .query_param("page", "2")
            .query_param("order", "title");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"data": {"animeList": [{"animeId": "a"}]}, "pagination": {"totalPages": 7}}"#);
    });

    let page = service(&server)
        .anime_summaries(&Section::Ongoing, 2, &CancellationToken::new())
        .await
        .expect("Failed to list ongoing");

    mock.assert();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 7);
}

#[tokio::test]
async fn test_search() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/samehadaku/search")
            .query_param("q", "sousou no frieren")
            .query_param("page", "1");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("search_frieren.json"));
    });

    let page = service(&server)
        .search_anime("sousou no frieren", 1, &CancellationToken::new())
        .await
        .expect("Failed to search");

    mock.assert();
    assert_eq!(page.total_pages, 4);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].title, "Sousou no Frieren");
    assert_eq!(page.items[1].media_type, "ONA");
}

#[tokio::test]
async fn test_anime_detail() {
    let server = MockServer::start();
    let mock = json_mock(&server, "/samehadaku/anime/sousou-no-frieren", "anime_frieren.json");
    let service = service(&server);

    let detail = service
        .anime_detail("sousou-no-frieren", &CancellationToken::new())
        .await
        .expect("Failed to fetch detail");

    mock.assert();
    assert_eq!(detail.summary.id, "sousou-no-frieren");
    assert_eq!(detail.summary.title, "Sousou no Frieren");
    assert_eq!(detail.summary.episode_label.as_deref(), Some("28"));
    assert_eq!(detail.status, "Completed");
    assert_eq!(detail.score.as_deref(), Some("9.10"));
    assert_eq!(detail.studio.as_deref(), Some("Madhouse"));
    assert_eq!(detail.genres, vec!["Adventure", "Drama", "Fantasy"]);
    assert!(detail.synopsis.starts_with("The demon king has been defeated.\n\n"));

    let episodes: Vec<(&str, &str)> = detail
        .episodes
        .iter()
        .map(|e| (e.id.as_str(), e.title.as_str()))
        .collect();
    assert_eq!(
        episodes,
        vec![
            ("sousou-no-frieren-episode-28", "28"),
            ("sousou-no-frieren-episode-27", "27"),
            ("sousou-no-frieren-episode-26", "Episode 3"),
        ]
    );
    assert_eq!(service.stats().dropped_episodes(), 1);
}

#[tokio::test]
async fn test_episode() {
    let server = MockServer::start();
    let mock = json_mock(
        &server,
        "/samehadaku/episode/sousou-no-frieren-episode-1",
        "episode_frieren_1.json",
    );

    let view = service(&server)
        .episode("sousou-no-frieren-episode-1", &CancellationToken::new())
        .await
        .expect("Failed to fetch episode");

    mock.assert();
    assert_eq!(view.episode.id, "sousou-no-frieren-episode-1");
    assert_eq!(view.episode.title, "Sousou no Frieren Episode 1 Sub Indo");
    assert_eq!(view.anime_id.as_deref(), Some("sousou-no-frieren"));

    let servers: Vec<&str> = view.servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(servers, vec!["2F1A-360", "2F1A-720", "2F1A-720-mega"]);

    assert_eq!(view.downloads.len(), 2);
    assert_eq!(view.downloads[0].quality(), "MKV 480p");
    assert_eq!(view.downloads[1].links()[0].size.as_deref(), Some("212 MB"));
}

#[tokio::test]
async fn test_streaming_server_returns_markup() {
    let server = MockServer::start();
    json_mock(&server, "/samehadaku/server/2F1A-360", "server_embed.json");

    let content = service(&server)
        .resolve_streaming_url("2F1A-360", &CancellationToken::new())
        .await
        .expect("Failed to resolve server");

    assert!(matches!(content, ServerContent::EmbedMarkup(_)));
    assert!(content.as_str().contains("blogger.com"));
}

#[tokio::test]
async fn test_streaming_server_streaming_url_field() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/server/2F1A-720");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status": "Ok", "data": {"streamingUrl": "https://player.example/e/720"}}"#);
    });

    let content = service(&server)
        .resolve_streaming_url("2F1A-720", &CancellationToken::new())
        .await
        .expect("Failed to resolve server");

    assert_eq!(
        content,
        ServerContent::Url("https://player.example/e/720".to_string())
    );
}

#[tokio::test]
async fn test_streaming_server_plain_text_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/server/raw");
        then.status(200)
            .header("content-type", "text/plain")
            .body("https://player.example/e/raw");
    });

    let err = service(&server)
        .resolve_streaming_url("raw", &CancellationToken::new())
        .await
        .unwrap_err();

    // The text wrapper has no url field.
    assert!(matches!(err, ServiceError::Shape(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_genres() {
    let server = MockServer::start();
    json_mock(&server, "/samehadaku/genres", "genres.json");

    let genres = service(&server)
        .genres(&CancellationToken::new())
        .await
        .expect("Failed to list genres");

    let ids: Vec<&str> = genres.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["action", "adventure", "slice-of-life"]);
    assert_eq!(genres[2].title, "Slice of Life");
}

#[tokio::test]
async fn test_batch_download_through_service() {
    let server = MockServer::start();
    json_mock(&server, "/samehadaku/batch/sousou-no-frieren", "batch_frieren.json");

    let model = service(&server)
        .resolve_batch_download("sousou-no-frieren", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    assert!(model.batch_available());
}

#[tokio::test]
async fn test_superseded_invocation_is_cancelled() {
    let server = MockServer::start();
    let mock = json_mock(&server, "/samehadaku/anime/sousou-no-frieren", "anime_frieren.json");
    let service = service(&server);
    let tracker = InvocationTracker::new();

    let stale = tracker.begin("anime-detail");
    let latest = tracker.begin("anime-detail");

    let err = service
        .anime_detail("sousou-no-frieren", stale.token())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(!stale.is_current());

    let detail = service
        .anime_detail("sousou-no-frieren", latest.token())
        .await
        .expect("Failed to fetch detail");
    assert!(tracker.finish(latest, detail).is_some());
    assert_eq!(tracker.in_flight(), 0);
    mock.assert_hits(1);
}
