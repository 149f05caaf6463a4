//! # Identity Service ライブラリ
//!
//! メールアドレス管理 API とセキュリティ通知を提供する。
//! 統合テストからルーター構築とユースケースにアクセスできるよう公開する。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
