//! # 通知
//!
//! セキュリティ通知とパスコードメールに関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 備考 |
//! |---|------------|------|
//! | [`SecurityNotification`] | 通知イベント | バリアントごとにテンプレート変数を持つ |
//! | [`NotificationKind`] | 通知種別 | 件名メッセージ ID と本文テンプレート ID を決める |
//! | [`EmailMessage`] | 送信メール | Mailer に渡される完成済みメッセージ |
//!
//! ## 設計方針
//!
//! - **enum による通知イベント**: テンプレート変数をバリアントのフィールドとして型で表現する
//! - **テンプレート分離**: 通知イベントとメール生成は分離（レンダリングは identity-service）
//! - **パスコードは常に送信**: 有効フラグを持つのはセキュリティ通知 4 種のみ

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

/// 通知エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// どの候補言語にもテンプレートが存在しない
    #[error("テンプレートが見つかりません: {0}")]
    TemplateNotFound(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),
}

/// 通知種別
///
/// ログの `notification.kind` フィールドには snake_case の文字列で出力される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    /// ログイン用パスコード
    Passcode,
    /// パスワード更新
    PasswordUpdate,
    /// プライマリメールアドレス変更
    PrimaryEmailUpdate,
    /// メールアドレス追加
    EmailCreate,
    /// パスキー登録
    PasskeyCreate,
}

impl NotificationKind {
    /// 件名のメッセージ ID
    pub fn subject_message_id(&self) -> &'static str {
        match self {
            Self::Passcode => "email_subject_login",
            Self::PasswordUpdate => "email_subject_password_update",
            Self::PrimaryEmailUpdate => "email_subject_primary_email_update",
            Self::EmailCreate => "email_subject_email_create",
            Self::PasskeyCreate => "email_subject_passkey_create",
        }
    }

    /// 本文のテンプレート ID
    pub fn body_template_id(&self) -> &'static str {
        match self {
            Self::Passcode => "login",
            Self::PasswordUpdate => "password_update",
            Self::PrimaryEmailUpdate => "primary_email_update",
            Self::EmailCreate => "email_create",
            Self::PasskeyCreate => "passkey_create",
        }
    }

    /// 本文の形式
    pub fn body_format(&self) -> BodyFormat {
        match self {
            Self::Passcode => BodyFormat::PlainText,
            _ => BodyFormat::Html,
        }
    }

    /// セキュリティ通知か（有効フラグと返信先の対象）
    pub fn is_security_notification(&self) -> bool {
        !matches!(self, Self::Passcode)
    }
}

/// 本文の形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyFormat {
    PlainText,
    Html,
}

impl BodyFormat {
    /// テンプレートファイルの拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Html => "html",
        }
    }
}

/// セキュリティ通知イベント
///
/// 各バリアントのフィールドがそのままテンプレート変数になる。
/// サービス名や通知先アドレスなどの共通変数は送信時に合成する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SecurityNotification {
    /// ログイン用パスコード
    Passcode { code: String, ttl_minutes: u32 },
    /// パスワードが更新された
    PasswordUpdate,
    /// プライマリメールアドレスが変更された → 旧プライマリに送信
    PrimaryEmailUpdate {
        old_address: String,
        new_address: String,
    },
    /// メールアドレスが追加された → 現在のプライマリに送信
    EmailCreate { new_address: String },
    /// パスキーが登録された
    PasskeyCreate,
}

impl SecurityNotification {
    /// 通知種別を返す
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Passcode { .. } => NotificationKind::Passcode,
            Self::PasswordUpdate => NotificationKind::PasswordUpdate,
            Self::PrimaryEmailUpdate { .. } => NotificationKind::PrimaryEmailUpdate,
            Self::EmailCreate { .. } => NotificationKind::EmailCreate,
            Self::PasskeyCreate => NotificationKind::PasskeyCreate,
        }
    }
}

/// 送信元・宛先・返信先を表すメールボックス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub address: String,
    pub name:    Option<String>,
}

impl Mailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name:    None,
        }
    }

    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name:    Some(name.into()),
        }
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。Mailer に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to:       Mailbox,
    pub from:     Mailbox,
    pub reply_to: Option<Mailbox>,
    pub subject:  String,
    pub body:     String,
    pub format:   BodyFormat,
}
