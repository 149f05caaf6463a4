//! # Kagi インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: メールアドレスの永続化
//! - **メール送信**: SMTP / Noop の `Mailer` 実装
//! - **セッション参照**: Redis に保存されたセッションの取得
//!
//! ## 依存関係
//!
//! ```text
//! identity-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`mailer`] - メール送信
//! - [`repository`] - リポジトリ実装
//! - [`session`] - Redis セッション管理
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use kagi_infra::{db, session::RedisSessionManager};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/kagi").await?;
//!     db::run_migrations(&pool).await?;
//!
//!     let sessions = RedisSessionManager::new("redis://localhost:6379").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod mailer;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;
pub mod session;

pub use error::{InfraError, InfraErrorKind};
pub use mailer::{Mailer, NoopMailer, SmtpCredentials, SmtpMailer};
pub use session::{RedisSessionManager, SessionData, SessionManager};
