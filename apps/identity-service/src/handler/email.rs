//! # メールアドレス管理 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /emails` - ログインユーザーのメールアドレス一覧
//! - `POST /emails` - メールアドレス追加
//! - `POST /emails/{id}/set_primary` - プライマリメールアドレスの切り替え
//! - `DELETE /emails/{id}` - メールアドレス削除
//!
//! すべてのエンドポイントはセッション Cookie（`kagi_session`）による認証が必要。

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, header::ACCEPT_LANGUAGE, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use kagi_domain::{
    email::{Email, EmailId},
    user::UserId,
};
use kagi_infra::SessionManager;
use kagi_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::IdentityError, usecase::EmailUseCaseImpl};

/// Cookie 名
pub const SESSION_COOKIE_NAME: &str = "kagi_session";

/// メールアドレス管理 API の共有状態
pub struct EmailState {
    pub usecase:         Arc<EmailUseCaseImpl>,
    pub session_manager: Arc<dyn SessionManager>,
}

// --- リクエスト型 ---

/// メールアドレス追加リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateEmailRequest {
    pub address: String,
}

/// パスの `{id}` から取り出したメールアドレス ID
///
/// UUID として解釈できない場合は `BadRequest`（RFC 9457 形式）で拒否する。
pub struct EmailIdPath(pub EmailId);

impl<S> FromRequestParts<S> for EmailIdPath
where
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| IdentityError::BadRequest(rejection.body_text()))?;
        Ok(Self(EmailId::from_uuid(id)))
    }
}

// --- レスポンス型 ---

/// メールアドレスデータ
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailData {
    pub id:         String,
    pub address:    String,
    pub is_primary: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Email> for EmailData {
    fn from(email: &Email) -> Self {
        Self {
            id:         email.id().to_string(),
            address:    email.address().to_string(),
            is_primary: email.is_primary(),
            created_at: email.created_at().to_rfc3339(),
            updated_at: email.updated_at().to_rfc3339(),
        }
    }
}

// --- 共通ヘルパー ---

/// セッション Cookie からログインユーザーを特定する
async fn authenticate(
    session_manager: &dyn SessionManager,
    jar: &CookieJar,
) -> Result<UserId, IdentityError> {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(IdentityError::Unauthorized)?;

    match session_manager.get(&session_id).await? {
        Some(data) => Ok(data.user_id().clone()),
        None => Err(IdentityError::Unauthorized),
    }
}

fn accept_language(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
}

// --- ハンドラ ---

/// GET /emails
#[tracing::instrument(skip_all)]
pub async fn list_emails(
    State(state): State<Arc<EmailState>>,
    jar: CookieJar,
) -> Result<Response, IdentityError> {
    let user_id = authenticate(state.session_manager.as_ref(), &jar).await?;

    let user_emails = state.usecase.list_emails(&user_id).await?;

    let items: Vec<EmailData> = user_emails.iter().map(EmailData::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))).into_response())
}

/// POST /emails
#[tracing::instrument(skip_all)]
pub async fn create_email(
    State(state): State<Arc<EmailState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<CreateEmailRequest>,
) -> Result<Response, IdentityError> {
    let user_id = authenticate(state.session_manager.as_ref(), &jar).await?;

    let email = state
        .usecase
        .create_email(&user_id, &req.address, accept_language(&headers))
        .await?;

    tracing::info!(email_id = %email.id(), "メールアドレスを追加しました");
    Ok((StatusCode::OK, Json(ApiResponse::new(EmailData::from(&email)))).into_response())
}

/// POST /emails/{id}/set_primary
#[tracing::instrument(skip_all, fields(%email_id))]
pub async fn set_primary_email(
    State(state): State<Arc<EmailState>>,
    headers: HeaderMap,
    jar: CookieJar,
    EmailIdPath(email_id): EmailIdPath,
) -> Result<Response, IdentityError> {
    let user_id = authenticate(state.session_manager.as_ref(), &jar).await?;

    state
        .usecase
        .set_primary_email(&user_id, &email_id, accept_language(&headers))
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// DELETE /emails/{id}
#[tracing::instrument(skip_all, fields(%email_id))]
pub async fn delete_email(
    State(state): State<Arc<EmailState>>,
    jar: CookieJar,
    EmailIdPath(email_id): EmailIdPath,
) -> Result<Response, IdentityError> {
    let user_id = authenticate(state.session_manager.as_ref(), &jar).await?;

    state
        .usecase
        .delete_email(&user_id, &email_id)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
