//! # リポジトリ実装
//!
//! ドメインエンティティの永続化を担当する。
//!
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でインメモリ実装に差し替え可能

pub mod email_repository;

pub use email_repository::{
    EMAIL_CONFLICT,
    EmailInsertion,
    EmailRepository,
    PRIMARY_EMAIL_CONFLICT,
    PostgresEmailRepository,
};
