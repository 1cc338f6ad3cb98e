use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use shopfront::config::{Config, RegistrationMode, ResetConfig, SessionConfig};
use shopfront::email::{EmailChannel, OutgoingEmail};
use shopfront::state::AppState;

pub const ADMIN_PASSWORD: &str = "password123";

/// Captures outgoing mail instead of delivering it.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailChannel for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), String> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub mailer: RecordingMailer,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A separate browser: its own cookie jar, so its own session.
    pub fn new_client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    pub async fn register_with(
        &self,
        client: &Client,
        username: &str,
        email: &str,
        password: &str,
    ) -> (Value, StatusCode) {
        self.post_json(
            client,
            "/api/v1/auth/register",
            &json!({ "username": username, "email": email, "password": password }),
        )
        .await
    }

    pub async fn login_with(&self, client: &Client, username: &str, password: &str) -> (Value, StatusCode) {
        self.post_json(
            client,
            "/api/v1/auth/login",
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register the bootstrap user on the default client. It holds every permission.
    pub async fn bootstrap(&self) -> Value {
        let (body, status) = self
            .register_with(&self.client, "admin", "admin@test.com", ADMIN_PASSWORD)
            .await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body
    }

    /// Register a regular (browse-only) user on a fresh client.
    pub async fn customer(&self, username: &str) -> Client {
        let client = self.new_client();
        let (body, status) = self
            .register_with(&client, username, &format!("{username}@test.com"), ADMIN_PASSWORD)
            .await;
        assert_eq!(status, StatusCode::OK, "customer register failed: {body}");
        client
    }

    pub async fn create_product(&self, name: &str, price: &str) -> Value {
        let (body, status) = self
            .post_json(
                &self.client,
                "/api/v1/products",
                &json!({ "name": name, "price": price, "stock": 10 }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create product failed: {body}");
        body
    }

    pub async fn get_json(&self, client: &Client, path: &str) -> (Value, StatusCode) {
        let resp = client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        read(resp).await
    }

    pub async fn post_json(&self, client: &Client, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        read(resp).await
    }

    pub async fn put_json(&self, client: &Client, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("put request failed");
        read(resp).await
    }

    pub async fn delete(&self, client: &Client, path: &str) -> (Value, StatusCode) {
        let resp = client
            .delete(self.url(path))
            .send()
            .await
            .expect("delete request failed");
        read(resp).await
    }

    /// Fetch an HTML page, returning (body, status).
    pub async fn get_page(&self, client: &Client, path: &str) -> (String, StatusCode) {
        let resp = client
            .get(self.url(path))
            .send()
            .await
            .expect("page request failed");
        let status = resp.status();
        (resp.text().await.unwrap_or_default(), status)
    }

    /// Wait for the mailer to hold `count` messages. Reset mail is sent from a background task.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} email(s), got {}", self.mailer.sent().len());
    }
}

async fn read(resp: reqwest::Response) -> (Value, StatusCode) {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(json!(null));
    (body, status)
}

/// Pull the path of the reset link out of an email body.
pub fn reset_path(body: &str) -> String {
    let start = body.find("/reset/").expect("email contains no reset link");
    let rest = &body[start..];
    let end = rest.find('"').unwrap_or(rest.len());
    rest[..end].to_string()
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(ResetConfig::default()).await
}

pub async fn spawn_app_with(reset: ResetConfig) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!("shopfront_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let session_store = shopfront::session_store(&pool)
        .await
        .expect("Failed to create session store");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        database_url: test_url,
        host: "127.0.0.1".parse().unwrap(),
        port: addr.port(),
        base_url: format!("http://{addr}"),
        registration: RegistrationMode::Open,
        log_level: "warn".to_string(),
        reset,
        session: SessionConfig {
            idle_minutes: 30,
            cookie_secure: false,
        },
        smtp: None,
        social: None,
    };

    let mailer = RecordingMailer::default();
    let state = Arc::new(AppState::new(pool.clone(), config).with_mailer(Arc::new(mailer.clone())));
    let app = shopfront::build_app(state, session_store);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        mailer,
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
