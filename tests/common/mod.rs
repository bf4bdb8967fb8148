//! Common test utilities for E2E tests

use ripple::{config, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        ripple::metrics::init_metrics();

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            media: config::MediaConfig {
                upload_url: "https://images.test.example.com/upload".to_string(),
                upload_preset: "test-preset".to_string(),
            },
            reconcile: config::ReconcileConfig {
                // Exercised directly in tests, not on a timer
                enabled: false,
                interval_seconds: 3600,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = ripple::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign up a user and return (token, user_id)
    pub async fn signup(&self, first_name: &str, email: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/api/v1/auth/signup"))
            .json(&serde_json::json!({
                "first_name": first_name,
                "surname": "Tester",
                "email": email,
                "password": "difference1",
                "phone": ""
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "signup failed for {}", email);

        let body: Value = response.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        (token, user_id)
    }

    /// Sign up a user and claim a username
    pub async fn signup_with_username(
        &self,
        first_name: &str,
        email: &str,
        username: &str,
    ) -> (String, String) {
        let (token, user_id) = self.signup(first_name, email).await;

        let response = self
            .client
            .post(self.url("/api/v1/auth/username"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "username claim failed for {}", username);

        (token, user_id)
    }

    /// Create a text post for a user, returning the post id
    pub async fn create_text_post(&self, token: &str, text: &str) -> String {
        let form = reqwest::multipart::Form::new().text("text", text.to_string());

        let response = self
            .client
            .post(self.url("/api/v1/posts"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "post creation failed");

        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}
