//! # セッション管理
//!
//! Redis に保存されたセッションを参照する。
//! セッションの発行（ログイン）は別サービスの責務で、このサービスは参照のみ行う。
//!
//! ## Redis キー設計
//!
//! | キー | 値 |
//! |-----|-----|
//! | `session:{session_id}` | SessionData (JSON) |
//!
//! TTL の設定と延長は発行側が行う。

use async_trait::async_trait;
use kagi_domain::user::UserId;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::Deserialize;

use crate::InfraError;

/// セッションデータ
///
/// このサービスが参照するのはユーザー ID のみ。
/// 発行側が保存するその他のフィールドは読み捨てる。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionData {
    user_id: UserId,
}

impl SessionData {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// セッション参照トレイト
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// セッションを取得する
    ///
    /// セッションが存在すれば `Some(SessionData)`、なければ `None`
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError>;
}

/// Redis を使用したセッションマネージャ
pub struct RedisSessionManager {
    conn: ConnectionManager,
}

impl RedisSessionManager {
    /// 新しい RedisSessionManager を作成する
    ///
    /// # 引数
    ///
    /// - `redis_url`: Redis 接続 URL（例: `redis://localhost:6379`）
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn session_key(session_id: &str) -> String {
        format!("session:{session_id}")
    }
}

#[async_trait]
impl SessionManager for RedisSessionManager {
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        let key = Self::session_key(session_id);
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(&key).await?;

        match result {
            Some(json) => {
                let data: SessionData = serde_json::from_str(&json)?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn セッションキーはsession_プレフィックス付き() {
        assert_eq!(RedisSessionManager::session_key("abc"), "session:abc");
    }

    #[test]
    fn 発行側のセッションjsonからユーザーidを読み取れる() {
        let user_id = UserId::new();
        let json = serde_json::json!({
            "user_id": user_id.to_string(),
            "created_at": "2026-01-01T00:00:00Z",
            "last_accessed_at": "2026-01-01T00:10:00Z",
        })
        .to_string();

        let data: SessionData = serde_json::from_str(&json).unwrap();

        assert_eq!(data.user_id(), &user_id);
    }

    #[test]
    fn ユーザーidのないセッションjsonはエラー() {
        let result = serde_json::from_str::<SessionData>(r#"{"created_at":"2026-01-01T00:00:00Z"}"#);

        assert!(result.is_err());
    }
}
