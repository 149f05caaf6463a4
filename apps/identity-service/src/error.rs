//! # Identity Service エラー定義
//!
//! Identity Service 固有のエラーと、HTTP レスポンスへの変換を定義する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kagi_domain::DomainError;
use kagi_infra::InfraError;
use kagi_shared::ErrorResponse;
use thiserror::Error;

/// Identity Service で発生するエラー
#[derive(Debug, Error)]
pub enum IdentityError {
    /// リソースが見つからない（他ユーザーの所有を含む）
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 未認証
    #[error("認証が必要です")]
    Unauthorized,

    /// 競合
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// データベース・Redis エラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),
}

impl From<DomainError> for IdentityError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let body = match &self {
            IdentityError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            IdentityError::BadRequest(msg) => ErrorResponse::validation_error(msg.clone()),
            IdentityError::Unauthorized => ErrorResponse::unauthorized("認証が必要です"),
            IdentityError::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
            IdentityError::Database(e) => {
                tracing::error!(
                    error.category = "infrastructure",
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
