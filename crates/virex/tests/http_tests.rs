//! Transfer client and service API against a mock HTTP server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::RecordingObserver;
use virex::api::{DeepLink, VirexApi};
use virex::job::{JobRunner, JobState, JobSubmission};
use virex::store::ArtifactStore;
use virex::transfer::{FailureKind, TransferClient, TransferError, TransferRequest};
use virex::{ErrorCategory, SessionStore, TransferConfig, VirexError};

fn fast_config() -> TransferConfig {
    TransferConfig {
        connect_timeout_secs: 5,
        read_timeout_secs: 30,
        max_attempts: 3,
        retry_base_delay_ms: 10,
    }
}

fn signed_in_session(url: &str) -> Arc<SessionStore> {
    let session = Arc::new(SessionStore::in_memory(url));
    session
        .apply_auth(&virex::api::AuthResponse {
            success: true,
            token: Some("wire-token".to_string()),
            user: Some(virex::api::UserInfo {
                id: 7,
                username: Some("wire".to_string()),
                first_name: Some("Wire".to_string()),
            }),
            ..Default::default()
        })
        .unwrap();
    session
}

fn client_for(session: Arc<SessionStore>, config: &TransferConfig) -> TransferClient {
    TransferClient::new(config, session).unwrap()
}

/// Address nothing is listening on.
fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_job_uploads_multipart_and_stores_result() {
    let server = MockServer::start().await;
    let result = vec![0x5Au8; 512 * 1024];

    Mock::given(method("POST"))
        .and(path("/api/video/process"))
        .and(header("X-User-Id", "7"))
        .and(header("X-Auth-Token", "wire-token"))
        .and(body_string_contains("name=\"video\""))
        .and(body_string_contains("name=\"template\""))
        .and(body_string_contains("tiktok"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(result.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("clip.mp4");
    std::fs::write(&source, vec![1u8; 64 * 1024]).unwrap();
    let store = ArtifactStore::new(temp_dir.path().join("cache"));

    let session = signed_in_session(&server.uri());
    let runner = JobRunner::new(client_for(session, &fast_config()), store.clone());
    let observer = RecordingObserver::new();

    let snapshot = runner
        .run(JobSubmission::new(&source, "tiktok"), &observer)
        .await;

    assert_eq!(snapshot.state, JobState::Completed, "{:?}", snapshot.error);
    let artifact = snapshot.result.unwrap();
    assert_eq!(artifact.size_bytes, result.len() as u64);
    assert_eq!(std::fs::read(&artifact.path).unwrap(), result);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejection_is_returned_once_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/video/process"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "Server busy"
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("clip.mp4");
    std::fs::write(&source, b"video").unwrap();
    let store = ArtifactStore::new(temp_dir.path().join("cache"));
    let runner = JobRunner::new(
        client_for(signed_in_session(&server.uri()), &fast_config()),
        store.clone(),
    );

    let snapshot = runner
        .run(JobSubmission::new(&source, "tiktok"), &RecordingObserver::new())
        .await;

    let error = snapshot.error.unwrap();
    assert_eq!(error.category, ErrorCategory::ServerRejected);
    assert_eq!(error.message, "Server busy");
    assert_eq!(error.status, Some(503));
    assert!(store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_refused_connection_exhausts_retries() {
    let session = Arc::new(SessionStore::in_memory(&refused_url()));
    let client = client_for(session, &fast_config());

    let err = client
        .send(TransferRequest::get("api/health"))
        .await
        .unwrap_err();

    match &err {
        TransferError::RetriesExhausted { attempts, kind, .. } => {
            assert_eq!(*attempts, 3);
            assert_eq!(*kind, FailureKind::Connect);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.category(), ErrorCategory::ConnectionFailed);
}

#[tokio::test]
async fn test_slow_server_times_out_on_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = TransferConfig {
        read_timeout_secs: 1,
        ..fast_config()
    };
    let client = client_for(Arc::new(SessionStore::in_memory(&server.uri())), &config);

    let err = client
        .send(TransferRequest::get("api/health"))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

/// Serves one `200 OK` whose body arrives a byte at a time, `gap` apart.
async fn trickling_server(body: &'static [u8], gap: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        for byte in body {
            tokio::time::sleep(gap).await;
            socket.write_all(&[*byte]).await.unwrap();
            socket.flush().await.unwrap();
        }
    });

    url
}

#[tokio::test]
async fn test_slow_steady_download_outlasts_read_timeout() {
    let body: &'static [u8] = b"steady";
    let url = trickling_server(body, Duration::from_millis(400)).await;

    let config = TransferConfig {
        read_timeout_secs: 1,
        max_attempts: 1,
        ..fast_config()
    };
    let client = client_for(Arc::new(SessionStore::in_memory(&url)), &config);
    let temp_dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp_dir.path());

    let started = std::time::Instant::now();
    let response = client
        .send(TransferRequest::get("api/video/result"))
        .await
        .unwrap();
    let artifact = store.register(response.into_body()).await.unwrap();

    // Six reads 400 ms apart: well past the 1 s read timeout overall.
    assert!(started.elapsed() > Duration::from_secs(2));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), body);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_endpoint_change_applies_to_next_call() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
    }

    let session = Arc::new(SessionStore::in_memory(&first.uri()));
    let api = VirexApi::new(client_for(session.clone(), &fast_config()));

    assert!(api.health_check().await.unwrap().is_healthy());
    session.set_server_url(&second.uri()).unwrap();
    assert!(api.health_check().await.unwrap().is_healthy());
}

#[tokio::test]
async fn test_health_check_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let api = VirexApi::new(client_for(
        Arc::new(SessionStore::in_memory(&server.uri())),
        &fast_config(),
    ));

    let status = api.health_check().await.unwrap();
    assert_eq!(status.status, 500);
    assert!(!status.is_healthy());
}

#[tokio::test]
async fn test_authenticate_stores_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/deeplink"))
        .and(body_json(serde_json::json!({
            "user_id": "555",
            "auth_code": "abc123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "token": "fresh-token",
            "user": { "id": 555, "username": "newbie", "first_name": "Nina" },
            "subscription": { "is_premium": true, "plan": "pro" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::in_memory(&server.uri()));
    let api = VirexApi::new(client_for(session.clone(), &fast_config()));
    let link = DeepLink::parse("virexpro://auth?user_id=555&code=abc123").unwrap();

    let response = api.authenticate(&link).await.unwrap();

    assert!(response.success);
    assert!(session.is_logged_in());
    assert_eq!(session.user_id(), 555);
    assert!(session.is_premium());
    assert_eq!(session.display_name(), "Nina");
}

#[tokio::test]
async fn test_authenticate_failure_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/deeplink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": "Code expired"
        })))
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::in_memory(&server.uri()));
    let api = VirexApi::new(client_for(session.clone(), &fast_config()));
    let link = DeepLink::parse("virexpro://auth?user_id=1&code=old").unwrap();

    let err = api.authenticate(&link).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ServerRejected);
    assert!(err.to_string().contains("Code expired"), "{}", err);
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn test_refresh_subscription_requires_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/subscription"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = VirexApi::new(client_for(
        Arc::new(SessionStore::in_memory(&server.uri())),
        &fast_config(),
    ));

    let err = api.refresh_subscription().await.unwrap_err();
    assert!(matches!(
        err,
        VirexError::Transfer(TransferError::Precondition(_))
    ));
    assert_eq!(err.category(), ErrorCategory::PreconditionFailed);
}

#[tokio::test]
async fn test_refresh_subscription_updates_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/subscription"))
        .and(header("X-User-Id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_premium": true,
            "plan": "pro",
            "subscription": { "type": "monthly", "expires": 1893456000 },
            "videos_today": 1,
            "total_videos": 12,
            "daily_limit": 100,
            "max_file_size": 500
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = signed_in_session(&server.uri());
    let api = VirexApi::new(client_for(session.clone(), &fast_config()));

    let info = api.refresh_subscription().await.unwrap();

    assert_eq!(info.daily_limit, 100);
    assert!(session.is_premium());
    assert_eq!(session.total_videos(), 12);
    assert_eq!(session.subscription_expires(), 1_893_456_000);
}

#[tokio::test]
async fn test_fetch_templates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "templates": [
                { "id": "tiktok", "name": "TikTok", "description": "Vertical cut" },
                { "id": "neon", "name": "Neon", "isPremium": true }
            ],
            "categories": [ { "id": "social", "name": "Social" } ]
        })))
        .mount(&server)
        .await;

    let api = VirexApi::new(client_for(
        Arc::new(SessionStore::in_memory(&server.uri())),
        &fast_config(),
    ));

    let templates = api.fetch_templates().await.unwrap();
    assert_eq!(templates.templates.len(), 2);
    assert!(templates.templates[1].is_premium);
    assert_eq!(templates.categories.unwrap()[0].id, "social");
}

#[tokio::test]
async fn test_video_info_returns_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/video/info"))
        .and(header("X-Auth-Token", "wire-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "duration": 12.5,
            "width": 1080
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("clip.mp4");
    std::fs::write(&source, b"video").unwrap();

    let api = VirexApi::new(client_for(
        signed_in_session(&server.uri()),
        &fast_config(),
    ));

    let info = api.video_info(&source).await.unwrap();
    assert_eq!(info["width"], 1080);
}
