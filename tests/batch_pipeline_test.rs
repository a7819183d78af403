//! Tests for batch-download resolution against mock servers.

mod common;

use std::sync::Arc;

use animek::batch::BatchResolver;
use animek::batch::error::BatchError;
use animek::batch::model::BatchSource;
use animek::batch::model::MESSAGE_EPISODES_ONLY;
use animek::batch::model::MESSAGE_NOT_FOUND;
use httpmock::Method::GET;
use httpmock::MockServer;
use tokio_util::sync::CancellationToken;

use crate::common::SOURCE;
use crate::common::get_response;
use crate::common::transport;

fn resolver(server: &MockServer) -> BatchResolver {
    BatchResolver::new(Arc::new(transport(server)), SOURCE)
}

#[tokio::test]
async fn test_primary_endpoint_wins_over_embedded_batch() {
    let server = MockServer::start();
    let batch = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/sousou-no-frieren");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("batch_frieren.json"));
    });
    let detail = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/sousou-no-frieren");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("anime_embedded_batch.json"));
    });

    let model = resolver(&server)
        .resolve("sousou-no-frieren", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    batch.assert();
    detail.assert_hits(0);
    assert!(model.batch_available());
    assert_eq!(model.source(), Some(BatchSource::BatchEndpoint));
    assert_eq!(model.title(), "Sousou no Frieren [BATCH]");

    let qualities: Vec<&str> = model.download_links().iter().map(|g| g.quality()).collect();
    assert_eq!(qualities, vec!["MKV 480p", "MKV 1080p"]);

    let links = model.download_links()[0].links();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].host, "Gofile");
    assert_eq!(links[0].size.as_deref(), Some("3.1 GB"));
    assert_eq!(model.download_links()[1].links()[0].host, "mediafire.com");
}

#[tokio::test]
async fn test_embedded_batch_when_primary_is_missing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/sousou-no-frieren");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"ok": false, "message": "Batch not found"}"#);
    });
    let detail = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/sousou-no-frieren");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("anime_embedded_batch.json"));
    });

    let model = resolver(&server)
        .resolve("sousou-no-frieren", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    detail.assert();
    assert_eq!(model.source(), Some(BatchSource::EmbeddedBatch));
    // The anime detail's own title and poster win over the batch object's.
    assert_eq!(model.title(), "Sousou no Frieren");
    assert_eq!(
        model.poster(),
        "https://v1.samehadaku.how/wp-content/uploads/2023/09/frieren.jpg"
    );
    assert_eq!(model.download_links()[0].quality(), "MP4 360p");
}

#[tokio::test]
async fn test_cascade_reaches_per_episode_downloads() {
    let server = MockServer::start();
    let batch = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/dandadan");
        then.status(404).body("Not Found");
    });
    let detail = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/dandadan");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("anime_episode_downloads.json"));
    });

    let model = resolver(&server)
        .resolve("dandadan", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    // 404 is retried like any other failure.
    batch.assert_hits(3);
    // Fetched once, shared by every detail-based strategy.
    detail.assert_hits(1);

    assert!(model.batch_available());
    assert_eq!(model.source(), Some(BatchSource::EpisodeDownloads));
    assert_eq!(model.title(), "Dandadan");

    let groups = model.download_links();
    let labels: Vec<&str> = groups.iter().map(|g| g.quality()).collect();
    assert_eq!(labels, vec!["Episode 1", "Episode 2", "Episode 3"]);
    assert_eq!(groups[0].links().len(), 2);
    assert_eq!(groups[1].links().len(), 2);
    assert_eq!(groups[2].links()[0].host, "mediafire.com");
}

#[tokio::test]
async fn test_unavailable_with_episodes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/dandadan");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status": "Ok", "data": {}}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/dandadan");
        then.status(200)
            .header("content-type", "application/json")
            .body(get_response("anime_no_downloads.json"));
    });

    let model = resolver(&server)
        .resolve("dandadan", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    assert!(!model.batch_available());
    assert!(model.download_links().is_empty());
    assert!(model.has_episodes());
    assert_eq!(model.message(), Some(MESSAGE_EPISODES_ONLY));
    assert_eq!(model.title(), "Dandadan");

    let json = serde_json::to_value(&model).expect("Failed to serialize");
    assert_eq!(json["batchAvailable"], false);
    assert_eq!(json["downloadLinks"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unavailable_with_nothing_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/unknown");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status": "Ok", "data": {"downloadLinks": []}}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/unknown");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status": "Ok", "data": {"title": "Unknown", "episodeList": []}}"#);
    });

    let model = resolver(&server)
        .resolve("unknown", &CancellationToken::new())
        .await
        .expect("Failed to resolve batch");

    assert!(!model.batch_available());
    assert!(!model.has_episodes());
    assert_eq!(model.message(), Some(MESSAGE_NOT_FOUND));
}

#[tokio::test]
async fn test_both_fetches_failing_is_one_aggregated_error() {
    let server = MockServer::start();
    let batch = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/batch/x");
        then.status(503).body("Service Unavailable");
    });
    let detail = server.mock(|when, then| {
        when.method(GET).path("/samehadaku/anime/x");
        then.status(503).body("Service Unavailable");
    });

    let err = resolver(&server)
        .resolve("x", &CancellationToken::new())
        .await
        .unwrap_err();

    batch.assert_hits(3);
    detail.assert_hits(3);
    assert!(matches!(err, BatchError::Transport { .. }));
}

#[tokio::test]
async fn test_cancelled_resolution_makes_no_request() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET);
        then.status(200).body("{}");
    });

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = resolver(&server).resolve("x", &cancel).await.unwrap_err();

    any.assert_hits(0);
    assert!(err.is_cancelled());
}
