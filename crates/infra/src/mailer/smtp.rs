//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境ではローカル SMTP サーバー（Mailpit 等）に接続する。

use async_trait::async_trait;
use kagi_domain::notification::{BodyFormat, EmailMessage, Mailbox, NotificationError};
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Message, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::Mailer;

/// SMTP 認証情報
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 2500）
    /// - `credentials`: 認証が必要な場合のユーザー名とパスワード
    pub fn new(host: &str, port: u16, credentials: Option<SmtpCredentials>) -> Self {
        // builder_dangerous: TLS なしで接続（ローカル SMTP 向け）
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
        if let Some(credentials) = credentials {
            builder = builder.credentials(Credentials::new(
                credentials.username,
                credentials.password,
            ));
        }

        Self {
            transport: builder.build(),
        }
    }
}

/// ドメインのメールボックスを lettre のメールボックスに変換する
fn to_lettre_mailbox(
    mailbox: &Mailbox,
    role: &str,
) -> Result<lettre::message::Mailbox, NotificationError> {
    let address: Address = mailbox
        .address
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("{role}アドレス不正: {e}")))?;
    Ok(lettre::message::Mailbox::new(mailbox.name.clone(), address))
}

/// 送信用の MIME メッセージを構築する
///
/// 本文は `format` に応じた単一パートの `text/plain` または `text/html`。
fn build_message(message: &EmailMessage) -> Result<Message, NotificationError> {
    let mut builder = Message::builder()
        .from(to_lettre_mailbox(&message.from, "送信元")?)
        .to(to_lettre_mailbox(&message.to, "宛先")?)
        .subject(&message.subject);

    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(to_lettre_mailbox(reply_to, "返信先")?);
    }

    let content_type = match message.format {
        BodyFormat::PlainText => ContentType::TEXT_PLAIN,
        BodyFormat::Html => ContentType::TEXT_HTML,
    };

    builder
        .header(content_type)
        .body(message.body.clone())
        .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let mime = build_message(message)?;

        self.transport
            .send(mime)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}
