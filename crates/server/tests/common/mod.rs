//! Common test utilities for in-process API testing.
//!
//! Builds the real router over SQLite stores in a temp directory, with the
//! model and mail provider replaced by mocks.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use triage_core::{
    create_audit_system, load_config_from_str, testing::MockLlmClient,
    testing::MockMailSender, AnalysisClient, AssignmentResolver, AuditStore, CreateTicketRequest,
    CreateUserRequest, DispatcherConfig, Notifier, Role, SqliteAuditStore, SqliteTicketStore,
    SqliteUserStore, Ticket, TicketStore, TriageDispatcher, TriageWorkflow, User, UserStore,
};
use triage_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use triage_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[analysis]
provider = "ollama"
model = "test-model"
"#;

/// In-process server with controllable mocks.
pub struct TestFixture {
    pub router: Router,
    pub tickets: Arc<SqliteTicketStore>,
    pub users: Arc<SqliteUserStore>,
    pub llm: Arc<MockLlmClient>,
    pub mail: Arc<MockMailSender>,
    pub dispatcher: Arc<TriageDispatcher>,
    _temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

#[allow(dead_code)]
impl TestFixture {
    pub async fn new() -> Self {
        Self::with_dispatcher(DispatcherConfig {
            max_retries: 0,
            scan_interval_ms: 0,
            ..Default::default()
        })
        .await
    }

    pub async fn with_dispatcher(dispatcher_config: DispatcherConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = load_config_from_str(TEST_CONFIG).expect("valid test config");
        config.database.path = db_path.clone();
        config.dispatcher = dispatcher_config.clone();

        let audit_store: Arc<dyn AuditStore> =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));
        let tickets =
            Arc::new(SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"));
        let users = Arc::new(SqliteUserStore::new(&db_path).expect("Failed to create user store"));

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let llm = Arc::new(MockLlmClient::new("test-model"));
        let mail = Arc::new(MockMailSender::new());

        let workflow = TriageWorkflow::new(
            tickets.clone(),
            AnalysisClient::new(llm.clone()),
            AssignmentResolver::new(users.clone()),
            Notifier::new(mail.clone()),
        )
        .with_audit(audit_handle.clone());

        let dispatcher = Arc::new(TriageDispatcher::new(
            dispatcher_config,
            Arc::new(workflow),
            tickets.clone(),
            Some(audit_handle),
        ));

        let state = Arc::new(AppState::new(
            config,
            audit_store,
            tickets.clone(),
            Arc::clone(&dispatcher),
        ));

        Self {
            router: create_router(state),
            tickets,
            users,
            llm,
            mail,
            dispatcher,
            _temp_dir: temp_dir,
        }
    }

    pub fn create_ticket(&self, title: &str) -> Ticket {
        self.tickets
            .create(CreateTicketRequest::new(title, "Details", "user-1"))
            .expect("Failed to create ticket")
    }

    pub fn create_user(&self, email: &str, role: Role, skills: &[&str]) -> User {
        self.users
            .create(
                CreateUserRequest::new(email, "Test User", role)
                    .with_skills(skills.iter().copied()),
            )
            .expect("Failed to create user")
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(request_builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body, text }
    }
}
