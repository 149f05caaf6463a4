//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供

pub mod email;
pub mod health;

pub use email::{EmailState, create_email, delete_email, list_emails, set_primary_email};
pub use health::health_check;
