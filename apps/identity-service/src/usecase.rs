//! # ユースケース層
//!
//! Identity Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリと Mailer を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `email`: メールアドレス管理
//! - `notification`: セキュリティ通知の送信

pub mod email;
pub mod notification;

pub use email::EmailUseCaseImpl;
pub use notification::{NotificationOutcome, NotificationService, TemplateRenderer};
