//! # Kagi 共有ユーティリティ
//!
//! 各クレート（domain, infra, identity-service）から利用される共通型を提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum などの Web フレームワークには依存しない

pub mod api_response;
pub mod error_response;
pub mod health;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::{ErrorResponse, ProblemType};
pub use health::HealthResponse;
