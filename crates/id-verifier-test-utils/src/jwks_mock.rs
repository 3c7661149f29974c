//! Mock key-distribution endpoint
//!
//! Serves JWKS documents from a `wiremock::MockServer` with the `Expires`
//! header the key store reads its cache lifetime from.

use chrono::{DateTime, Utc};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mocks are mounted on, matching the provider's real endpoint.
pub const JWKS_PATH: &str = "/oauth2/v3/certs";

/// Full JWKS URL for a mock server.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// Format epoch seconds as an HTTP date (`Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn http_date(epoch_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
        .expect("timestamp should be in range")
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Serve `body` with the given `Expires` value.
///
/// The server panics on drop unless exactly `expected_fetches` requests
/// arrived.
pub async fn mount_jwks(server: &MockServer, body: Value, expires: &str, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Expires", expires)
                .set_body_json(body),
        )
        .expect(expected_fetches)
        .mount(server)
        .await;
}

/// Serve an arbitrary response on the JWKS path.
pub async fn mount_jwks_response(
    server: &MockServer,
    response: ResponseTemplate,
    expected_fetches: u64,
) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(response)
        .expect(expected_fetches)
        .mount(server)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_date_format() {
        assert_eq!(http_date(1_445_412_480), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn test_http_date_round_trips_through_rfc2822() {
        let parsed = DateTime::parse_from_rfc2822(&http_date(1_700_000_000)).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_mount_jwks_serves_expires_header() {
        let server = MockServer::start().await;
        mount_jwks(&server, serde_json::json!({"keys": []}), "Wed, 21 Oct 2015 07:28:00 GMT", 1).await;

        let response = reqwest::get(jwks_url(&server)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("expires").unwrap(),
            "Wed, 21 Oct 2015 07:28:00 GMT"
        );
    }
}
