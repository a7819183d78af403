//! Common test utilities.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use animek::service::AnimeService;
use animek::transport::HttpTransport;
use animek::transport::limiter::RequestLimiter;
use animek::transport::retry::RetryPolicy;
use httpmock::MockServer;

pub const SOURCE: &str = "samehadaku";

/// Loads a test response file from the responses directory.
#[allow(dead_code)]
pub fn get_response(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/responses");
    path.push(filename);
    std::fs::read_to_string(path).expect("Failed to read response file")
}

/// Transport against `server` with the default retry count, millisecond
/// backoff and no request limiter.
pub fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&server.base_url())
        .expect("Failed to build transport")
        .with_retry(RetryPolicy::new(2, Duration::from_millis(10), 1.5))
        .with_limiter(RequestLimiter::unlimited())
}

#[allow(dead_code)]
pub fn service(server: &MockServer) -> AnimeService {
    AnimeService::new(Arc::new(transport(server)), SOURCE)
}
