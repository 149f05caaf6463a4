//! # アプリケーション構築
//!
//! State の組み立てとルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use kagi_infra::{
    Mailer,
    NoopMailer,
    SessionManager,
    SmtpCredentials,
    SmtpMailer,
    repository::EmailRepository,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::{IdentityConfig, MailerBackend, MailerConfig},
    handler::{
        EmailState,
        create_email,
        delete_email,
        health_check,
        list_emails,
        set_primary_email,
    },
    usecase::{EmailUseCaseImpl, NotificationService, TemplateRenderer},
};

/// 設定に応じたメール送信バックエンドを作成する
pub fn build_mailer(config: &MailerConfig) -> Arc<dyn Mailer> {
    match config.backend {
        MailerBackend::Smtp => {
            let credentials = config.smtp_auth.as_ref().map(|auth| SmtpCredentials {
                username: auth.username.clone(),
                password: auth.password.clone(),
            });
            tracing::info!(
                host = %config.smtp_host,
                port = config.smtp_port,
                authenticated = credentials.is_some(),
                "SMTP でメールを送信します"
            );
            Arc::new(SmtpMailer::new(
                &config.smtp_host,
                config.smtp_port,
                credentials,
            ))
        }
        MailerBackend::Noop => {
            tracing::info!("メール送信は無効です（Noop）");
            Arc::new(NoopMailer)
        }
    }
}

/// ユースケースと State を組み立てる
pub fn build_email_state(
    config: &IdentityConfig,
    email_repository: Arc<dyn EmailRepository>,
    session_manager: Arc<dyn SessionManager>,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<Arc<EmailState>> {
    let renderer = TemplateRenderer::new(&config.notification.default_language)?;
    let notification_service = Arc::new(NotificationService::new(
        mailer,
        renderer,
        config.notification.clone(),
    ));
    let usecase = EmailUseCaseImpl::new(
        email_repository,
        notification_service,
        config.emails.max_num_of_addresses,
    );

    Ok(Arc::new(EmailState {
        usecase: Arc::new(usecase),
        session_manager,
    }))
}

/// ルーターを構築する
pub fn build_app(email_state: Arc<EmailState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/emails", get(list_emails).post(create_email))
        .route("/emails/{id}/set_primary", post(set_primary_email))
        .route("/emails/{id}", delete(delete_email))
        .with_state(email_state)
        .layer(TraceLayer::new_for_http())
}
