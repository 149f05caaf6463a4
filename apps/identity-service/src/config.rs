//! # Identity Service 設定
//!
//! 環境変数から Identity Service の設定を読み込む。
//!
//! 読み込み処理は [`IdentityConfig::from_lookup`] に集約しており、
//! テストでは環境変数を書き換えずに任意の値を与えられる。

use std::{env, str::FromStr};

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が設定されていない
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value:?}（{reason}）")]
    Invalid {
        name:   &'static str,
        value:  String,
        reason: String,
    },
}

/// Identity Service の設定
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    /// Redis 接続 URL（セッション参照用）
    pub redis_url:    String,
    /// メールアドレス管理の設定
    pub emails:       EmailsConfig,
    /// 通知の設定
    pub notification: NotificationConfig,
    /// メール送信バックエンドの設定
    pub mailer:       MailerConfig,
}

/// メールアドレス管理の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailsConfig {
    /// ユーザーあたりの最大登録件数（1 以上）
    pub max_num_of_addresses: usize,
}

/// 送信元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    pub address: String,
    pub name:    String,
}

/// 通知の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// テンプレートに渡すサービス名
    pub service_name:     String,
    /// テンプレートのフォールバック言語
    pub default_language: String,
    /// パスコードメールの送信元
    pub passcode_from:    SenderConfig,
    /// セキュリティ通知の設定
    pub security:         SecurityNotificationConfig,
}

/// セキュリティ通知の設定
///
/// 有効フラグはすべてデフォルト無効。パスコードはフラグを持たず常に送信する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityNotificationConfig {
    /// セキュリティ通知の送信元
    pub from:                         SenderConfig,
    /// 問い合わせ先（返信先とテンプレートに使用）
    pub notify_address:               Option<String>,
    pub password_update_enabled:      bool,
    pub primary_email_update_enabled: bool,
    pub email_create_enabled:         bool,
    pub passkey_create_enabled:       bool,
}

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MailerBackend {
    /// SMTP サーバー経由で送信
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// メール送信バックエンドの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub backend:   MailerBackend,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// SMTP 認証（`SMTP_USER` と `SMTP_PASSWORD` は両方指定か両方未指定）
    pub smtp_auth: Option<SmtpAuthConfig>,
}

/// SMTP 認証情報
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpAuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAuthConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl IdentityConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let max_num_of_addresses: usize = vars.parse_or("EMAILS_MAX_NUM_OF_ADDRESSES", 5)?;
        if max_num_of_addresses == 0 {
            return Err(ConfigError::Invalid {
                name:   "EMAILS_MAX_NUM_OF_ADDRESSES",
                value:  "0".to_string(),
                reason: "1 以上である必要があります".to_string(),
            });
        }

        Ok(Self {
            host: vars.or("IDENTITY_HOST", "0.0.0.0"),
            port: vars.parse_required("IDENTITY_PORT")?,
            database_url: vars.required("DATABASE_URL")?,
            redis_url: vars.or("REDIS_URL", "redis://localhost:6379"),
            emails: EmailsConfig {
                max_num_of_addresses,
            },
            notification: NotificationConfig {
                service_name:     vars.or("SERVICE_NAME", "Kagi"),
                default_language: vars.or("DEFAULT_LANGUAGE", "en"),
                passcode_from:    SenderConfig {
                    address: vars.or("PASSCODE_FROM_ADDRESS", "passcode@kagi.example.com"),
                    name:    vars.or("PASSCODE_FROM_NAME", "Kagi"),
                },
                security:         SecurityNotificationConfig {
                    from:                         SenderConfig {
                        address: vars.or(
                            "SECURITY_NOTIFICATIONS_FROM_ADDRESS",
                            "security@kagi.example.com",
                        ),
                        name:    vars.or("SECURITY_NOTIFICATIONS_FROM_NAME", "Kagi Security"),
                    },
                    notify_address:               vars
                        .optional("SECURITY_NOTIFICATIONS_NOTIFY_ADDRESS"),
                    password_update_enabled:      vars
                        .flag("SECURITY_NOTIFICATIONS_PASSWORD_UPDATE_ENABLED")?,
                    primary_email_update_enabled: vars
                        .flag("SECURITY_NOTIFICATIONS_PRIMARY_EMAIL_UPDATE_ENABLED")?,
                    email_create_enabled:         vars
                        .flag("SECURITY_NOTIFICATIONS_EMAIL_CREATE_ENABLED")?,
                    passkey_create_enabled:       vars
                        .flag("SECURITY_NOTIFICATIONS_PASSKEY_CREATE_ENABLED")?,
                },
            },
            mailer: MailerConfig {
                backend:   vars.parse_or("MAILER_BACKEND", MailerBackend::Noop)?,
                smtp_host: vars.or("SMTP_HOST", "localhost"),
                smtp_port: vars.parse_or("SMTP_PORT", 2500)?,
                smtp_auth: vars.smtp_auth()?,
            },
        })
    }
}

/// 環境変数の参照ヘルパー
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 値を取得する（空文字列は未設定扱い）
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_required<T>(&self, name: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.required(name)?;
        parse_value(name, value)
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => parse_value(name, value),
            None => Ok(default),
        }
    }

    /// SMTP 認証情報（片方だけの指定は不正）
    fn smtp_auth(&self) -> Result<Option<SmtpAuthConfig>, ConfigError> {
        match (self.optional("SMTP_USER"), self.optional("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Ok(Some(SmtpAuthConfig { username, password })),
            (None, None) => Ok(None),
            (Some(username), None) => Err(ConfigError::Invalid {
                name:   "SMTP_USER",
                value:  username,
                reason: "SMTP_PASSWORD と組で指定してください".to_string(),
            }),
            (None, Some(_)) => Err(ConfigError::Invalid {
                name:   "SMTP_PASSWORD",
                value:  "***".to_string(),
                reason: "SMTP_USER と組で指定してください".to_string(),
            }),
        }
    }

    /// 真偽値フラグ（`true` / `false` / `1` / `0`、未設定は `false`）
    fn flag(&self, name: &'static str) -> Result<bool, ConfigError> {
        match self.optional(name) {
            None => Ok(false),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    name,
                    value,
                    reason: "true / false / 1 / 0 のいずれかを指定してください".to_string(),
                }),
            },
        }
    }
}

fn parse_value<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}
