//! Test server harness for E2E testing
//!
//! Provides `TestVerifierServer` for spawning real identity verifier
//! instances in tests.

use id_verifier::auth::{KeyStore, TokenVerifier};
use id_verifier::clock::SystemClock;
use id_verifier::config::Config;
use id_verifier::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Test harness for spawning the identity verifier in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_me_flow_e2e() -> Result<()> {
///     let jwks = MockServer::start().await;
///     let server = TestVerifierServer::spawn(&jwks_url(&jwks), "client-123").await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/v1/me", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestVerifierServer {
    addr: SocketAddr,
    config: Config,
    verifier: Arc<TokenVerifier>,
    _handle: JoinHandle<()>,
}

impl TestVerifierServer {
    /// Spawn a new test server verifying tokens for `audience` against the
    /// key set at `jwks_url`.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and uses
    /// a Prometheus recorder that is not installed globally, so several
    /// servers can run in one process.
    pub async fn spawn(jwks_url: &str, audience: &str) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("IDP_AUDIENCE".to_string(), audience.to_string()),
            ("IDP_JWKS_URL".to_string(), jwks_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "5".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_store = Arc::new(KeyStore::with_options(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
            Arc::new(SystemClock),
        ));
        let verifier = Arc::new(TokenVerifier::new(key_store, config.audience.clone()));

        let state = Arc::new(AppState {
            config: config.clone(),
            verifier: verifier.clone(),
        });

        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            verifier,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The verifier shared by the server's handlers.
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }
}

impl Drop for TestVerifierServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
