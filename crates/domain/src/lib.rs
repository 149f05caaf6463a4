//! # Kagi ドメイン層
//!
//! メールアドレス管理とセキュリティ通知の中核となるドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! identity-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、SMTP、Redis）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメインエラー
//! - [`user`] - ユーザー識別子
//! - [`email`] - メールアドレスエンティティとユーザー単位のルール
//! - [`notification`] - セキュリティ通知イベントとメールメッセージ
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kagi_domain::email::EmailAddress;
//!
//! let address = EmailAddress::new(" User@Example.com ")?;
//! assert_eq!(address.as_str(), "user@example.com");
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod email;
pub mod error;
pub mod notification;
pub mod user;

pub use error::DomainError;
