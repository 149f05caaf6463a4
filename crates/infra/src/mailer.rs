//! # メール送信
//!
//! 完成済みの [`EmailMessage`] を外部へ送り出すインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `Mailer` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（開発・本番）、Noop（ログ出力のみ）
//! - **環境変数切替**: `MAILER_BACKEND` でランタイム選択
//! - **リトライなし**: 失敗は `NotificationError::SendFailed` として呼び出し元に返す

mod noop;
mod smtp;

use async_trait::async_trait;
use kagi_domain::notification::{EmailMessage, NotificationError};
pub use noop::NoopMailer;
pub use smtp::{SmtpCredentials, SmtpMailer};

/// メール送信トレイト
#[async_trait]
pub trait Mailer: Send + Sync {
    /// メールを送信する
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}
