//! メールアドレス管理 API 統合テスト
//!
//! インメモリのリポジトリ・セッション・Mailer を注入したルーターに
//! `oneshot` でリクエストを送り、HTTP レベルの振る舞いを検証する。
//!
//! 実行方法:
//! ```bash
//! cargo test -p kagi-identity-service --test email_handler_test
//! ```

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use kagi_domain::{
    email::{Email, EmailAddress, EmailId},
    user::UserId,
};
use kagi_identity_service::{
    app_builder::{build_app, build_email_state},
    config::IdentityConfig,
};
use kagi_infra::{
    SessionData,
    mock::{InMemoryEmailRepository, InMemorySessionManager, RecordingMailer},
};
use kagi_shared::{ApiResponse, ErrorResponse};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use tower::ServiceExt;

#[derive(Debug, Deserialize)]
struct EmailDto {
    address:    String,
    is_primary: bool,
}

struct TestApp {
    router:     Router,
    repo:       InMemoryEmailRepository,
    mailer:     RecordingMailer,
    user_id:    UserId,
    session_id: String,
}

/// テスト用アプリを構築する
///
/// `vars` は環境変数の上書き（必須項目は自動で補う）。
async fn setup(vars: &[(&str, &str)]) -> TestApp {
    let mut env: HashMap<String, String> = HashMap::from([
        ("IDENTITY_PORT".to_string(), "13010".to_string()),
        (
            "DATABASE_URL".to_string(),
            "postgres://localhost/kagi".to_string(),
        ),
        ("EMAILS_MAX_NUM_OF_ADDRESSES".to_string(), "3".to_string()),
    ]);
    for (key, value) in vars {
        env.insert(key.to_string(), value.to_string());
    }
    let config = IdentityConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

    let repo = InMemoryEmailRepository::new();
    let sessions = InMemorySessionManager::new();
    let mailer = RecordingMailer::new();

    let user_id = UserId::new();
    let session_id = "test-session".to_string();
    sessions.insert(session_id.clone(), SessionData::new(user_id.clone()));

    let state = build_email_state(
        &config,
        Arc::new(repo.clone()),
        Arc::new(sessions),
        Arc::new(mailer.clone()),
    )
    .unwrap();

    TestApp {
        router: build_app(state),
        repo,
        mailer,
        user_id,
        session_id,
    }
}

fn all_enabled() -> Vec<(&'static str, &'static str)> {
    vec![
        ("SECURITY_NOTIFICATIONS_EMAIL_CREATE_ENABLED", "true"),
        ("SECURITY_NOTIFICATIONS_PRIMARY_EMAIL_UPDATE_ENABLED", "true"),
        ("SECURITY_NOTIFICATIONS_NOTIFY_ADDRESS", "help@kagi.example.com"),
    ]
}

impl TestApp {
    fn seed(&self, address: &str, is_primary: bool, offset_secs: i64) -> Email {
        let email = Email::new(
            EmailId::new(),
            self.user_id.clone(),
            EmailAddress::new(address).unwrap(),
            is_primary,
            Utc::now() + Duration::seconds(offset_secs),
        );
        self.repo.add_email(email.clone());
        email
    }

    fn user_email_count(&self) -> usize {
        self.repo
            .emails()
            .iter()
            .filter(|e| e.user_id() == &self.user_id)
            .count()
    }

    fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("kagi_session={}", self.session_id))
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn create(&self, address: &str, accept_language: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = self
            .request(Method::POST, "/emails")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(lang) = accept_language {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        let body = serde_json::json!({ "address": address }).to_string();
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}

#[tokio::test]
async fn test_セッションcookieがなければ401() {
    let app = setup(&[]).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/emails")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.status, 401);
}

#[tokio::test]
async fn test_不明なセッションは401() {
    let app = setup(&[]).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/emails")
        .header(header::COOKIE, "kagi_session=unknown")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_一覧はプライマリが先頭で返る() {
    let app = setup(&[]).await;
    app.seed("second@example.com", false, 1);
    app.seed("primary@example.com", true, 0);
    let other = Email::new(
        EmailId::new(),
        UserId::new(),
        EmailAddress::new("other@example.com").unwrap(),
        true,
        Utc::now(),
    );
    app.repo.add_email(other);

    let request = app
        .request(Method::GET, "/emails")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse<Vec<EmailDto>> = serde_json::from_slice(&body).unwrap();
    let addresses: Vec<&str> = response.data.iter().map(|e| e.address.as_str()).collect();
    assert_eq!(addresses, vec!["primary@example.com", "second@example.com"]);
    assert!(response.data[0].is_primary);
}

#[rstest]
#[case("true", 1)]
#[case("false", 0)]
#[tokio::test]
async fn test_追加時の通知は有効フラグに従う(#[case] enabled: &str, #[case] expected: usize) {
    let app = setup(&[("SECURITY_NOTIFICATIONS_EMAIL_CREATE_ENABLED", enabled)]).await;
    app.seed("primary@example.com", true, 0);

    let (status, body) = app.create("New@Example.com", None).await;

    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse<EmailDto> = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.data.address, "new@example.com");
    assert!(!response.data.is_primary);
    assert_eq!(app.user_email_count(), 2);
    assert_eq!(app.mailer.count(), expected);
}

#[tokio::test]
async fn test_最初に追加したメールアドレスはプライマリ() {
    let app = setup(&all_enabled()).await;

    let (status, body) = app.create("first@example.com", None).await;

    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse<EmailDto> = serde_json::from_slice(&body).unwrap();
    assert!(response.data.is_primary);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_上限件数に達していると400で件数は変わらない() {
    let app = setup(&all_enabled()).await;
    app.seed("a@example.com", true, 0);
    app.seed("b@example.com", false, 1);
    app.seed("c@example.com", false, 2);

    let (status, body) = app.create("d@example.com", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.status, 400);
    assert_eq!(app.user_email_count(), 3);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_不正なアドレスは400() {
    let app = setup(&[]).await;

    let (status, _) = app.create("not-an-address", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.user_email_count(), 0);
}

#[tokio::test]
async fn test_登録済みのアドレスは409() {
    let app = setup(&[]).await;
    app.seed("taken@example.com", true, 0);

    let (status, _) = app.create("taken@example.com", None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.user_email_count(), 1);
}

#[tokio::test]
async fn test_プライマリ切り替えでちょうど1件だけがプライマリになる() {
    let app = setup(&all_enabled()).await;
    let old = app.seed("old@example.com", true, 0);
    let target = app.seed("target@example.com", false, 1);
    app.seed("third@example.com", false, 2);

    let request = app
        .request(
            Method::POST,
            &format!("/emails/{}/set_primary", target.id()),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let primaries: Vec<EmailId> = app
        .repo
        .emails()
        .iter()
        .filter(|e| e.is_primary())
        .map(|e| e.id().clone())
        .collect();
    assert_eq!(primaries, vec![target.id().clone()]);
    assert_eq!(app.mailer.count(), 1);
    let sent = app.mailer.latest().unwrap();
    assert_eq!(sent.to.address, old.address().as_str());
}

#[tokio::test]
async fn test_既にプライマリなら204で通知しない() {
    let app = setup(&all_enabled()).await;
    let primary = app.seed("primary@example.com", true, 0);

    let request = app
        .request(
            Method::POST,
            &format!("/emails/{}/set_primary", primary.id()),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_存在しないメールアドレスのプライマリ切り替えは404() {
    let app = setup(&[]).await;
    app.seed("primary@example.com", true, 0);

    let request = app
        .request(
            Method::POST,
            &format!("/emails/{}/set_primary", EmailId::new()),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[rstest]
#[case(Method::POST, "/emails/not-a-uuid/set_primary")]
#[case(Method::DELETE, "/emails/not-a-uuid")]
#[tokio::test]
async fn test_uuidでないidは400のerror_response(#[case] method: Method, #[case] uri: &str) {
    let app = setup(&[]).await;
    app.seed("primary@example.com", true, 0);

    let request = app.request(method, uri).body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.status, 400);
    assert_eq!(app.user_email_count(), 1);
}

#[tokio::test]
async fn test_プライマリの削除は409で件数は変わらない() {
    let app = setup(&[]).await;
    let primary = app.seed("primary@example.com", true, 0);
    app.seed("second@example.com", false, 1);

    let request = app
        .request(Method::DELETE, &format!("/emails/{}", primary.id()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.user_email_count(), 2);
}

#[tokio::test]
async fn test_プライマリ以外は削除できる() {
    let app = setup(&all_enabled()).await;
    app.seed("primary@example.com", true, 0);
    let second = app.seed("second@example.com", false, 1);

    let request = app
        .request(Method::DELETE, &format!("/emails/{}", second.id()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.user_email_count(), 1);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_他ユーザーのメールアドレスは削除できず404() {
    let app = setup(&[]).await;
    let other = Email::new(
        EmailId::new(),
        UserId::new(),
        EmailAddress::new("other@example.com").unwrap(),
        false,
        Utc::now(),
    );
    app.repo.add_email(other.clone());

    let request = app
        .request(Method::DELETE, &format!("/emails/{}", other.id()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.repo.emails().len(), 1);
}

#[rstest]
#[case(Some("ja-JP,ja;q=0.9"), "Kagi アカウントにメールアドレスが追加されました")]
#[case(Some("fr-FR,fr;q=0.9"), "A new email address was added to your Kagi account")]
#[case(None, "A new email address was added to your Kagi account")]
#[tokio::test]
async fn test_通知の言語はaccept_languageで決まる(
    #[case] accept_language: Option<&str>,
    #[case] expected_subject: &str,
) {
    let app = setup(&all_enabled()).await;
    app.seed("primary@example.com", true, 0);

    let (status, _) = app.create("second@example.com", accept_language).await;

    assert_eq!(status, StatusCode::OK);
    let sent = app.mailer.latest().unwrap();
    assert_eq!(sent.subject, expected_subject);
    assert_eq!(
        sent.reply_to.map(|mailbox| mailbox.address),
        Some("help@kagi.example.com".to_string())
    );
}

#[tokio::test]
async fn test_ヘルスチェック() {
    let app = setup(&[]).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}
