#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use onboarding_api::database::models::Role;
use onboarding_api::database::{MemoryStore, Store};
use onboarding_api::{app, AppConfig, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";

/// An in-process server over a fresh `MemoryStore`, one per test.
#[derive(Clone)]
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let mut config = AppConfig::development();
        config.api.port = port;
        config.security.jwt_secret = "integration-secret".to_string();
        config.security.bcrypt_cost = 4;
        config.cascade.retry_delay_ms = 1;

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        let router = app(state.clone()).into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("test server stopped: {}", e);
            }
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            state,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create the admin account directly; there is no HTTP route for it.
    pub async fn create_admin(&self) -> Result<String> {
        self.state
            .auth
            .create_identity(ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)
            .await?;
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post("/api/auth/register", None, json!({"email": email, "password": password}))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {status} {body}");
        token_of(&body)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post("/api/auth/login", None, json!({"email": email, "password": password}))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
        token_of(&body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await?).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await?).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.delete(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        read(request.send().await?).await
    }
}

async fn read(response: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

fn token_of(body: &Value) -> Result<String> {
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("response carried no token")
}

pub fn questionnaire() -> Value {
    json!({
        "accountCountry": "United States",
        "companyName": "Acme Coffee Shop",
        "companySize": "1-10",
        "industry": "retail",
        "primaryUseCase": "menu-boards",
        "useCaseDescription": "Menu boards behind the counter",
        "numberOfScreens": "1-5",
        "screenLocations": "Main counter",
        "technicalProficiency": "beginner",
        "currentPlatform": "Printed menus",
        "featureInterests": ["scheduling", "mobile-app"],
        "additionalComments": "",
        "referralSource": "search"
    })
}

pub fn questionnaire_with(overrides: Value) -> Value {
    let mut body = questionnaire();
    if let (Some(base), Value::Object(extra)) = (body.as_object_mut(), overrides) {
        base.extend(extra);
    }
    body
}
