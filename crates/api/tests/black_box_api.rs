use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pipeboard_api::config::ApiConfig;
use pipeboard_auth::{JwtClaims, OrgRole};
use pipeboard_core::{OrganizationId, UserId};
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = pipeboard_api::app::build_app(&ApiConfig::with_secret(JWT_SECRET))
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(organization_id: Option<OrganizationId>, org_role: Option<OrgRole>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        organization_id,
        org_role,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

/// Incremental reader over a `text/event-stream` response body.
struct SseReader {
    res: reqwest::Response,
    buf: String,
}

impl SseReader {
    async fn open(client: &reqwest::Client, srv: &TestServer, token: &str) -> Self {
        let res = client
            .get(srv.url("/pipeline/events"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let content_type = res.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"), "content-type was {content_type}");

        Self {
            res,
            buf: String::new(),
        }
    }

    /// Next raw frame (without the terminating blank line).
    async fn next_frame(&mut self) -> String {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let frame = self.buf[..end].to_string();
                self.buf.drain(..end + 2);
                return frame;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.res.chunk())
                .await
                .expect("timed out waiting for a stream frame")
                .unwrap()
                .expect("stream ended");
            self.buf.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// Reconnect hint sent as the first frame.
    async fn retry_ms(&mut self) -> u64 {
        let frame = self.next_frame().await;
        let value = frame
            .strip_prefix("retry:")
            .unwrap_or_else(|| panic!("expected retry frame, got {frame:?}"));
        value.trim().parse().unwrap()
    }

    /// Next event, skipping keepalive comments.
    async fn next_event(&mut self) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame.starts_with(':') {
                continue;
            }
            let data: String = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            return serde_json::from_str(&data).unwrap_or_else(|e| panic!("bad event {frame:?}: {e}"));
        }
    }
}

async fn create_pipeline(client: &reqwest::Client, srv: &TestServer, token: &str, name: &str) -> Value {
    let res = client
        .post(srv.url("/pipeline"))
        .bearer_auth(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn create_stage(client: &reqwest::Client, srv: &TestServer, token: &str, pipeline: &str, title: &str) -> Value {
    let res = client
        .post(srv.url(&format!("/pipeline/{pipeline}/stages")))
        .bearer_auth(token)
        .json(&json!({ "title": title }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn create_card(client: &reqwest::Client, srv: &TestServer, token: &str, pipeline: &str, stage: &str) -> Value {
    let res = client
        .post(srv.url(&format!("/pipeline/{pipeline}/cards")))
        .bearer_auth(token)
        .json(&json!({ "stageId": stage, "title": "Big deal", "value": 1200.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/pipeline", "/pipeline/events"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_context_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let org = OrganizationId::new();
    let token = mint_jwt(Some(org), Some(OrgRole::Pipeline));

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/whoami")).bearer_auth(token).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["organizationId"].as_str().unwrap(), org.to_string());
    assert_eq!(body["role"], "pipeline");
}

#[tokio::test]
async fn stream_rejects_sessions_without_organization() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(None, None);

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/pipeline/events"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stage_append_and_reorder_are_streamed_to_subscribers() {
    let srv = TestServer::spawn().await;
    let org = OrganizationId::new();
    let token = mint_jwt(Some(org), Some(OrgRole::Admin));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &token, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();
    let s1 = create_stage(&client, &srv, &token, &pid, "Lead").await;
    let s2 = create_stage(&client, &srv, &token, &pid, "Won").await;
    assert_eq!(s1["position"], 1000);
    assert_eq!(s2["position"], 2000);

    let mut stream = SseReader::open(&client, &srv, &token).await;
    assert_eq!(stream.retry_ms().await, 5000);

    let s3 = create_stage(&client, &srv, &token, &pid, "Lost").await;
    assert_eq!(s3["position"], 3000);
    let event = stream.next_event().await;
    assert_eq!(event["type"], "stage:create");
    assert_eq!(event["organizationId"].as_str().unwrap(), org.to_string());
    assert_eq!(event["payload"]["id"], s3["id"]);

    let reorder = json!([
        { "id": s2["id"], "position": 500 },
        { "id": s1["id"], "position": 1500 },
    ]);
    let res = client
        .patch(srv.url(&format!("/pipeline/{pid}/stages")))
        .bearer_auth(&token)
        .json(&reorder)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let event = stream.next_event().await;
    assert_eq!(event["type"], "stage:update");
    assert_eq!(event["payload"], reorder);

    let board: Value = client
        .get(srv.url(&format!("/pipeline/{pid}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stages: Vec<(Value, Value)> = board["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["id"].clone(), s["position"].clone()))
        .collect();
    assert_eq!(
        stages,
        vec![
            (s2["id"].clone(), json!(500)),
            (s1["id"].clone(), json!(1500)),
            (s3["id"].clone(), json!(3000)),
        ]
    );
}

#[tokio::test]
async fn member_cannot_change_stages_and_no_event_is_sent() {
    let srv = TestServer::spawn().await;
    let org = OrganizationId::new();
    let admin = mint_jwt(Some(org), Some(OrgRole::Owner));
    let member = mint_jwt(Some(org), Some(OrgRole::Member));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &admin, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();
    let stage = create_stage(&client, &srv, &admin, &pid, "Lead").await;

    let mut stream = SseReader::open(&client, &srv, &member).await;
    stream.retry_ms().await;

    let res = client
        .post(srv.url(&format!("/pipeline/{pid}/stages")))
        .bearer_auth(&member)
        .json(&json!({ "title": "Sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/pipeline/{pid}")))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Members may still work with cards; the card event is the first one seen.
    let card = create_card(&client, &srv, &member, &pid, stage["id"].as_str().unwrap()).await;
    let event = stream.next_event().await;
    assert_eq!(event["type"], "card:update");
    assert_eq!(event["payload"]["id"], card["card"]["id"]);
}

#[tokio::test]
async fn unrecognised_role_reads_the_board_but_cannot_change_stages() {
    let srv = TestServer::spawn().await;
    let org = OrganizationId::new();
    let admin = mint_jwt(Some(org), Some(OrgRole::Owner));
    let now = Utc::now();
    let viewer = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": UserId::new(),
            "organization_id": org,
            "org_role": "viewer",
            "issued_at": now,
            "expires_at": now + ChronoDuration::minutes(10),
        }),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt");
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &admin, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/pipeline/{pid}")))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url(&format!("/pipeline/{pid}/stages")))
        .bearer_auth(&viewer)
        .json(&json!({ "title": "Lead" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn card_delete_reaches_every_subscriber_of_the_organization_only() {
    let srv = TestServer::spawn().await;
    let org1 = OrganizationId::new();
    let org2 = OrganizationId::new();
    let token1 = mint_jwt(Some(org1), Some(OrgRole::Admin));
    let token2 = mint_jwt(Some(org2), Some(OrgRole::Admin));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &token1, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();
    let stage = create_stage(&client, &srv, &token1, &pid, "Lead").await;
    let created = create_card(&client, &srv, &token1, &pid, stage["id"].as_str().unwrap()).await;
    let card_id = created["card"]["id"].as_str().unwrap().to_string();

    let mut a = SseReader::open(&client, &srv, &token1).await;
    let mut b = SseReader::open(&client, &srv, &token1).await;
    let mut other = SseReader::open(&client, &srv, &token2).await;
    for reader in [&mut a, &mut b, &mut other] {
        reader.retry_ms().await;
    }

    let res = client
        .delete(srv.url(&format!("/pipeline/{pid}/cards/{card_id}")))
        .bearer_auth(&token1)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for reader in [&mut a, &mut b] {
        let event = reader.next_event().await;
        assert_eq!(event["type"], "card:delete");
        assert_eq!(event["payload"]["id"].as_str().unwrap(), card_id);
    }

    // org2's first event is its own.
    let own = create_pipeline(&client, &srv, &token2, "Other").await;
    let event = other.next_event().await;
    assert_eq!(event["type"], "pipeline:update");
    assert_eq!(event["organizationId"].as_str().unwrap(), org2.to_string());
    assert_eq!(event["payload"]["id"], own["id"]);
}

#[tokio::test]
async fn card_without_client_gets_a_placeholder_client() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(Some(OrganizationId::new()), Some(OrgRole::Admin));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &token, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();
    let stage = create_stage(&client, &srv, &token, &pid, "Lead").await;
    let created = create_card(&client, &srv, &token, &pid, stage["id"].as_str().unwrap()).await;

    let email = created["client"]["email"].as_str().unwrap();
    assert!(!email.is_empty());
    assert_eq!(created["card"]["clientId"], created["client"]["id"]);

    // Reusing that client creates no new one.
    let res = client
        .post(srv.url(&format!("/pipeline/{pid}/cards")))
        .bearer_auth(&token)
        .json(&json!({ "stageId": stage["id"], "title": "Upsell", "clientId": created["client"]["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let second: Value = res.json().await.unwrap();
    assert!(second.get("client").is_none());
    assert_eq!(second["card"]["position"], 2000);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(Some(OrganizationId::new()), Some(OrgRole::Admin));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &token, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();

    let res = client
        .patch(srv.url(&format!("/pipeline/{pid}/stages")))
        .bearer_auth(&token)
        .json(&json!({ "id": "x", "position": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let res = client
        .post(srv.url(&format!("/pipeline/{pid}/cards")))
        .bearer_auth(&token)
        .json(&json!({ "title": "No stage" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url(&format!("/pipeline/{pid}/stages")))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/pipeline/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn organization_isolation_blocks_cross_tenant_reads_and_writes() {
    let srv = TestServer::spawn().await;
    let token1 = mint_jwt(Some(OrganizationId::new()), Some(OrgRole::Owner));
    let token2 = mint_jwt(Some(OrganizationId::new()), Some(OrgRole::Owner));
    let client = reqwest::Client::new();

    let pipeline = create_pipeline(&client, &srv, &token1, "Sales").await;
    let pid = pipeline["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/pipeline/{pid}")))
        .bearer_auth(&token2)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .patch(srv.url(&format!("/pipeline/{pid}")))
        .bearer_auth(&token2)
        .json(&json!({ "name": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let listed: Value = client
        .get(srv.url("/pipeline"))
        .bearer_auth(&token2)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, json!([]));
}
