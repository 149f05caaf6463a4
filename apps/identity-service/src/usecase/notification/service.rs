//! # 通知サービス
//!
//! 有効判定 → テンプレートレンダリング → メール送信を統合するサービス。
//!
//! ## 設計方針
//!
//! - **種別ごとの有効フラグ**: 無効な種別は何も送らず `Skipped` を返す。パスコードは常に送信
//! - **送信元の使い分け**: パスコードはパスコード用送信元、それ以外はセキュリティ通知用送信元
//! - **リトライなし**: 送信失敗はそのまま呼び出し元へ返す
//! - **依存性注入**: `Mailer` は trait で抽象化

use std::sync::Arc;

use kagi_domain::notification::{
    EmailMessage,
    Mailbox,
    NotificationError,
    NotificationKind,
    SecurityNotification,
};
use kagi_infra::mailer::Mailer;
use tera::Context;

use super::TemplateRenderer;
use crate::config::NotificationConfig;

/// 送信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// メールを送信した
    Sent,
    /// 種別が無効のため送信しなかった
    Skipped,
}

/// 通知サービス
pub struct NotificationService {
    mailer:   Arc<dyn Mailer>,
    renderer: TemplateRenderer,
    config:   NotificationConfig,
}

impl NotificationService {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        renderer: TemplateRenderer,
        config: NotificationConfig,
    ) -> Self {
        Self {
            mailer,
            renderer,
            config,
        }
    }

    /// 通知種別が有効か
    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        let security = &self.config.security;
        match kind {
            NotificationKind::Passcode => true,
            NotificationKind::PasswordUpdate => security.password_update_enabled,
            NotificationKind::PrimaryEmailUpdate => security.primary_email_update_enabled,
            NotificationKind::EmailCreate => security.email_create_enabled,
            NotificationKind::PasskeyCreate => security.passkey_create_enabled,
        }
    }

    /// 通知を送信する
    ///
    /// # 引数
    ///
    /// - `to`: 宛先メールアドレス
    /// - `accept_language`: リクエストの `Accept-Language` ヘッダー（テンプレートの言語選択に使う）
    /// - `notification`: 通知イベント
    pub async fn send(
        &self,
        to: &str,
        accept_language: Option<&str>,
        notification: &SecurityNotification,
    ) -> Result<NotificationOutcome, NotificationError> {
        let kind = notification.kind();
        let kind_str: &'static str = kind.into();

        if !self.is_enabled(kind) {
            tracing::debug!(
                notification.kind = kind_str,
                notification.recipient = %to,
                "通知種別が無効のため送信をスキップ"
            );
            return Ok(NotificationOutcome::Skipped);
        }

        let message = self.compose(to, accept_language, notification)?;

        match self.mailer.send(&message).await {
            Ok(()) => {
                tracing::info!(
                    notification.kind = kind_str,
                    notification.recipient = %to,
                    "通知メール送信成功"
                );
                Ok(NotificationOutcome::Sent)
            }
            Err(e) => {
                tracing::error!(
                    notification.kind = kind_str,
                    notification.recipient = %to,
                    error = %e,
                    "通知メール送信失敗"
                );
                Err(e)
            }
        }
    }

    /// 件名と本文をレンダリングしてメールメッセージを組み立てる
    fn compose(
        &self,
        to: &str,
        accept_language: Option<&str>,
        notification: &SecurityNotification,
    ) -> Result<EmailMessage, NotificationError> {
        let kind = notification.kind();
        let context = self.build_context(notification)?;

        let body = self
            .renderer
            .render(kind.body_template_id(), accept_language, &context)?;
        let subject =
            self.renderer
                .translate(accept_language, kind.subject_message_id(), &context)?;

        let security = &self.config.security;
        let (from, reply_to) = if kind.is_security_notification() {
            (
                Mailbox::with_name(&security.from.address, &security.from.name),
                security.notify_address.as_deref().map(Mailbox::new),
            )
        } else {
            let passcode = &self.config.passcode_from;
            (Mailbox::with_name(&passcode.address, &passcode.name), None)
        };

        Ok(EmailMessage {
            to: Mailbox::new(to),
            from,
            reply_to,
            subject,
            body,
            format: kind.body_format(),
        })
    }

    /// 共通変数と通知イベント固有の変数を合成する
    fn build_context(
        &self,
        notification: &SecurityNotification,
    ) -> Result<Context, NotificationError> {
        let mut context = Context::new();
        context.insert("service_name", &self.config.service_name);
        context.insert("notify_address", &self.config.security.notify_address);

        let fields = serde_json::to_value(notification)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;
        if let serde_json::Value::Object(fields) = fields {
            for (key, value) in fields {
                context.insert(key, &value);
            }
        }

        Ok(context)
    }
}
