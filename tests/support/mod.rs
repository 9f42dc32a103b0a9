// Shared primitives for one-time server bootstrapping across integration tests.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use museum_booking::domain::entities::Identity;
use museum_booking::frameworks::config;

pub const VISITOR_TOKEN: &str = "integration-visitor";
pub const OTHER_TOKEN: &str = "integration-other";

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// In-memory settings with two known bearer tokens.
fn test_settings() -> config::Settings {
    let mut settings = config::from_toml_str("").expect("default settings");
    settings.database_url = None;
    settings.auth.service_url = None;
    for (token, user_id) in [(VISITOR_TOKEN, 101), (OTHER_TOKEN, 202)] {
        settings.auth.static_tokens.insert(
            token.to_string(),
            Identity {
                user_id,
                display_name: format!("Visitor {user_id}"),
            },
        );
    }
    settings
}

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // The server thread owns its runtime so it outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                museum_booking::run_with_settings(listener, test_settings())
                    .await
                    .expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

// Fresh session id so tests sharing the server never see each other's drafts.
pub fn new_session() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

// A bookable date far enough out that no other test fills its slots.
pub fn future_date(days_ahead: i64) -> String {
    (chrono::Local::now().date_naive() + chrono::Duration::days(days_ahead)).to_string()
}

pub async fn turn(
    client: &reqwest::Client,
    session: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> serde_json::Value {
    let mut request = client
        .post(format!("{}/chatbot", ensure_server()))
        .header("x-session-id", session)
        .json(&body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("request should succeed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json().await.expect("json body")
}
