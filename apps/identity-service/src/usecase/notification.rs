//! # 通知ユースケース
//!
//! セキュリティ通知とパスコードメールの生成・送信を統合する。
//!
//! ## モジュール構成
//!
//! - [`language`] - `Accept-Language` ヘッダーからの候補言語決定
//! - [`template_renderer`] - tera テンプレートエンジンによる件名・本文の生成
//! - [`service`] - 有効判定 + レンダリング + 送信の統合サービス

pub mod language;
pub mod service;
pub mod template_renderer;

pub use service::{NotificationOutcome, NotificationService};
pub use template_renderer::TemplateRenderer;
