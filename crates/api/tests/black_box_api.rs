use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;

use portal_api::app::services::{AppServices, InMemoryBackend, build_services};
use portal_api::config::AppConfig;
use portal_auth::{Claims, CredentialStore, Identity, Role, UserStatus, password};
use portal_core::{ProjectId, UserId};
use portal_infra::{Project, WorkspaceStore};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    backend: InMemoryBackend,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            token_ttl: Duration::hours(1),
            bind: String::new(),
            dev_errors: false,
        };
        let (services, backend) = build_services(&config);

        // Same router as prod, bound to an ephemeral port.
        let app = portal_api::app::build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            backend,
            handle,
        }
    }

    fn seed_user(&self, email: &str, pass: &str, role: Role) -> Identity {
        let hash = password::hash(pass).expect("hashing failed");
        self.backend
            .credentials
            .insert(email.to_string(), hash, role)
    }

    fn seed_project(&self, id: i64, owner: UserId, name: &str) {
        self.backend.workspace.seed_project(Project {
            id: ProjectId::new(id),
            name: name.to_string(),
            description: None,
            owner_id: owner,
            created_at: Utc::now(),
        });
    }

    async fn login(&self, client: &reqwest::Client, email: &str, pass: &str) -> String {
        let res = client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": pass }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login failed for {email}");
        let body: serde_json::Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/projects", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_are_indistinguishable() {
    let srv = TestServer::spawn().await;
    srv.seed_user("alice@example.com", "right-password", Role::User);
    let client = reqwest::Client::new();

    let attempt = |email: &str, pass: &str| {
        let client = client.clone();
        let url = format!("{}/api/auth/login", srv.base_url);
        let body = json!({ "email": email, "password": pass });
        async move { client.post(url).json(&body).send().await.unwrap() }
    };

    let unknown = attempt("nobody@example.com", "whatever").await;
    let wrong = attempt("alice@example.com", "wrong-password").await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown_body = unknown.text().await.unwrap();
    let wrong_body = wrong.text().await.unwrap();
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn blocking_invalidates_an_outstanding_token() {
    let srv = TestServer::spawn().await;
    let user = srv.seed_user("bob@example.com", "pw123456", Role::User);
    let client = reqwest::Client::new();

    let token = srv.login(&client, "bob@example.com", "pw123456").await;

    // Token works before the block...
    let res = client
        .get(format!("{}/api/projects", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    srv.services
        .credentials
        .set_status(user.id, UserStatus::Blocked)
        .await
        .unwrap();

    // ...and is rejected on the very next request.
    let res = client
        .get(format!("{}/api/projects", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let srv = TestServer::spawn().await;
    let user = srv.seed_user("carol@example.com", "pw123456", Role::User);

    // Mint a token that expired an hour ago, signed with the right secret.
    let now = Utc::now();
    let claims = Claims::for_identity(
        &user,
        (now - Duration::hours(2)).timestamp(),
        (now - Duration::hours(1)).timestamp(),
    );
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/api/projects", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_owner_cannot_delete_and_the_resource_survives() {
    let srv = TestServer::spawn().await;
    let owner = srv.seed_user("owner@example.com", "pw123456", Role::User);
    srv.seed_user("intruder@example.com", "pw123456", Role::User);
    srv.seed_project(42, owner.id, "Owned");

    let client = reqwest::Client::new();
    let token = srv.login(&client, "intruder@example.com", "pw123456").await;

    let res = client
        .delete(format!("{}/api/projects/42", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let still_there = srv
        .backend
        .workspace
        .get_project(ProjectId::new(42))
        .await
        .unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn nonexistent_resource_is_not_found_not_forbidden() {
    let srv = TestServer::spawn().await;
    srv.seed_user("dave@example.com", "pw123456", Role::User);

    let client = reqwest::Client::new();
    let token = srv.login(&client, "dave@example.com", "pw123456").await;

    let res = client
        .get(format!("{}/api/projects/999", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_bypasses_ownership_and_the_delete_is_audited() {
    let srv = TestServer::spawn().await;
    let admin = srv.seed_user("root@example.com", "pw123456", Role::Admin);
    let owner = srv.seed_user("owner@example.com", "pw123456", Role::User);
    srv.seed_project(42, owner.id, "Someone else's");

    let client = reqwest::Client::new();
    let token = srv.login(&client, "root@example.com", "pw123456").await;

    let res = client
        .delete(format!("{}/api/projects/42", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let deletes: Vec<_> = srv
        .backend
        .audit
        .all()
        .into_iter()
        .filter(|r| r.event.action == portal_audit::AuditAction::ProjectDelete)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].event.actor, Some(admin.id));
    assert_eq!(deletes[0].event.entity_id, Some(42));
}

#[tokio::test]
async fn sixth_login_attempt_is_rate_limited_and_not_audited() {
    let srv = TestServer::spawn().await;
    srv.seed_user("eve@example.com", "pw123456", Role::User);
    let client = reqwest::Client::new();

    for _ in 0..5 {
        let res = client
            .post(format!("{}/api/auth/login", srv.base_url))
            .json(&json!({ "email": "eve@example.com", "password": "wrong-guess" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = client
        .post(format!("{}/api/auth/login", srv.base_url))
        .json(&json!({ "email": "eve@example.com", "password": "wrong-guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    // Only the five attempts that reached the credential check were audited.
    let fails = srv
        .backend
        .audit
        .all()
        .into_iter()
        .filter(|r| r.event.action == portal_audit::AuditAction::LoginFail)
        .count();
    assert_eq!(fails, 5);
}

#[tokio::test]
async fn failed_logins_record_the_attempted_email_and_reason() {
    let srv = TestServer::spawn().await;
    srv.seed_user("frank@example.com", "pw123456", Role::User);
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", srv.base_url))
        .json(&json!({ "email": "frank@example.com", "password": "wrong-guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/api/auth/login", srv.base_url))
        .json(&json!({ "email": "ghost@example.com", "password": "wrong-guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let fails: Vec<_> = srv
        .backend
        .audit
        .all()
        .into_iter()
        .filter(|r| r.event.action == portal_audit::AuditAction::LoginFail)
        .collect();
    assert_eq!(fails.len(), 2);

    let wrong_password = fails[0].event.details.as_ref().unwrap();
    assert_eq!(wrong_password["email"], "frank@example.com");
    assert_eq!(wrong_password["error"], "Invalid password");

    let unknown = fails[1].event.details.as_ref().unwrap();
    assert_eq!(unknown["email"], "ghost@example.com");
    assert_eq!(unknown["error"], "User not found");
    assert_eq!(fails[1].event.actor, None);
}

#[tokio::test]
async fn rejected_login_input_still_lands_in_the_ledger() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", srv.base_url))
        .json(&json!({ "email": "not-an-email", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let fails: Vec<_> = srv
        .backend
        .audit
        .all()
        .into_iter()
        .filter(|r| r.event.action == portal_audit::AuditAction::LoginFail)
        .collect();
    assert_eq!(fails.len(), 1);

    let details = fails[0].event.details.as_ref().unwrap();
    assert_eq!(details["email"], "not-an-email");
    assert_eq!(details["error"], "Validation failed");
}

#[tokio::test]
async fn login_validation_reports_missing_fields() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", srv.base_url))
        .json(&json!({ "email": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = res.json().await.unwrap();
    let details = body["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d == "Email is required"));
    assert!(details.iter().any(|d| d == "Password is required"));
}

#[tokio::test]
async fn block_guards_admins_and_noop_transitions() {
    let srv = TestServer::spawn().await;
    srv.seed_user("root@example.com", "pw123456", Role::Admin);
    let victim = srv.seed_user("victim@example.com", "pw123456", Role::User);
    let other_admin = srv.seed_user("root2@example.com", "pw123456", Role::Admin);

    let client = reqwest::Client::new();
    let token = srv.login(&client, "root@example.com", "pw123456").await;

    // First block succeeds.
    let res = client
        .put(format!(
            "{}/api/admin/users/{}/block",
            srv.base_url,
            victim.id.as_i64()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Blocking again is a reported no-op.
    let res = client
        .put(format!(
            "{}/api/admin/users/{}/block",
            srv.base_url,
            victim.id.as_i64()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Admin accounts are protected even from valid transitions.
    let res = client
        .put(format!(
            "{}/api/admin/users/{}/block",
            srv.base_url,
            other_admin.id.as_i64()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The successful block carries the target's email and prior status;
    // the two rejected attempts land in the ledger as failures.
    let blocks: Vec<_> = srv
        .backend
        .audit
        .all()
        .into_iter()
        .filter(|r| r.event.action == portal_audit::AuditAction::AdminUserBlock)
        .collect();
    assert_eq!(blocks.len(), 3);

    let successes: Vec<_> = blocks
        .iter()
        .filter(|r| r.event.result == portal_audit::AuditResult::Success)
        .collect();
    assert_eq!(successes.len(), 1);
    let details = successes[0].event.details.as_ref().unwrap();
    assert_eq!(details["target_email"], "victim@example.com");
    assert_eq!(details["previous_status"], "active");
}

#[tokio::test]
async fn admin_surface_is_admin_only() {
    let srv = TestServer::spawn().await;
    srv.seed_user("plain@example.com", "pw123456", Role::User);
    srv.seed_user("root@example.com", "pw123456", Role::Admin);

    let client = reqwest::Client::new();
    let user_token = srv.login(&client, "plain@example.com", "pw123456").await;
    let admin_token = srv.login(&client, "root@example.com", "pw123456").await;

    for path in ["/api/admin/users", "/api/admin/logs", "/api/admin/stats"] {
        let res = client
            .get(format!("{}{path}", srv.base_url))
            .bearer_auth(&user_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{path}");

        let res = client
            .get(format!("{}{path}", srv.base_url))
            .bearer_auth(&admin_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn task_lifecycle_under_an_owned_project() {
    let srv = TestServer::spawn().await;
    let owner = srv.seed_user("owner@example.com", "pw123456", Role::User);
    srv.seed_project(7, owner.id, "With tasks");

    let client = reqwest::Client::new();
    let token = srv.login(&client, "owner@example.com", "pw123456").await;

    // Create
    let res = client
        .post(format!("{}/api/projects/7/tasks", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "Ship it", "status": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let task: serde_json::Value = res.json().await.unwrap();
    let task_id = task["id"].as_i64().unwrap();

    // Update to done
    let res = client
        .put(format!("{}/api/projects/7/tasks/{task_id}", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "Ship it", "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["status"], "done");

    // Bad status is rejected with details
    let res = client
        .put(format!("{}/api/projects/7/tasks/{task_id}", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "title": "Ship it", "status": "paused" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Delete
    let res = client
        .delete(format!("{}/api/projects/7/tasks/{task_id}", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn logs_are_filterable_by_action() {
    let srv = TestServer::spawn().await;
    srv.seed_user("root@example.com", "pw123456", Role::Admin);
    let client = reqwest::Client::new();
    let token = srv.login(&client, "root@example.com", "pw123456").await;

    let res = client
        .get(format!("{}/api/admin/logs?action=login", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["action"], "login.success");
}
