//! # テスト用インメモリ実装
//!
//! ハンドラ・ユースケーステストで使用するインメモリのリポジトリ、Mailer、セッション管理。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! kagi-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kagi_domain::{
    email::{Email, EmailAddress, EmailId, UserEmails},
    notification::{EmailMessage, NotificationError},
    user::UserId,
};

use crate::{
    error::InfraError,
    mailer::Mailer,
    repository::{EMAIL_CONFLICT, EmailInsertion, EmailRepository},
    session::{SessionData, SessionManager},
};

// ===== InMemoryEmailRepository =====

/// インメモリの EmailRepository
///
/// 各操作は 1 回のロック内で完結させ、PostgreSQL 実装の排他と同じく
/// 登録上限とプライマリの一意性を並行呼び出しでも保つ。
#[derive(Clone, Default)]
pub struct InMemoryEmailRepository {
    emails: Arc<Mutex<Vec<Email>>>,
}

impl InMemoryEmailRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// テストデータを直接追加する
    ///
    /// # Panics
    ///
    /// アドレスの重複、または同一ユーザーに 2 件目のプライマリを追加しようとした場合。
    pub fn add_email(&self, email: Email) {
        let mut emails = self.emails.lock().unwrap();
        assert!(
            !emails.iter().any(|e| e.address() == email.address()),
            "アドレスが重複しています: {}",
            email.address()
        );
        assert!(
            !(email.is_primary()
                && emails
                    .iter()
                    .any(|e| e.user_id() == email.user_id() && e.is_primary())),
            "プライマリが重複しています: {}",
            email.user_id()
        );
        emails.push(email);
    }

    /// 保存されているメールアドレスのスナップショット
    pub fn emails(&self) -> Vec<Email> {
        self.emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailRepository for InMemoryEmailRepository {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Email>, InfraError> {
        Ok(self
            .emails
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn insert_for_user(
        &self,
        user_id: &UserId,
        id: EmailId,
        address: EmailAddress,
        max_num_of_addresses: usize,
        now: DateTime<Utc>,
    ) -> Result<EmailInsertion, InfraError> {
        let mut emails = self.emails.lock().unwrap();

        let mut user_emails = UserEmails::new(user_id.clone(), emails.clone());
        let primary = user_emails.primary().map(|e| e.address().clone());
        let email = match user_emails.add(id, address, max_num_of_addresses, now) {
            Ok(email) => email,
            Err(e) => return Ok(EmailInsertion::Rejected(e)),
        };

        if emails.iter().any(|e| e.address() == email.address()) {
            return Err(InfraError::conflict(
                EMAIL_CONFLICT,
                email.address().as_str(),
            ));
        }
        emails.push(email.clone());
        Ok(EmailInsertion::Inserted { email, primary })
    }

    async fn set_primary(
        &self,
        user_id: &UserId,
        id: &EmailId,
        now: DateTime<Utc>,
    ) -> Result<bool, InfraError> {
        let mut emails = self.emails.lock().unwrap();
        if !emails
            .iter()
            .any(|e| e.id() == id && e.user_id() == user_id)
        {
            return Ok(false);
        }
        for email in emails.iter_mut().filter(|e| e.user_id() == user_id) {
            let is_primary = email.id() == id;
            if email.is_primary() != is_primary {
                *email = Email::from_db(
                    email.id().clone(),
                    email.user_id().clone(),
                    email.address().clone(),
                    is_primary,
                    email.created_at(),
                    now,
                );
            }
        }
        Ok(true)
    }

    async fn delete(&self, user_id: &UserId, id: &EmailId) -> Result<bool, InfraError> {
        let mut emails = self.emails.lock().unwrap();
        let before = emails.len();
        emails.retain(|e| !(e.id() == id && e.user_id() == user_id));
        Ok(emails.len() < before)
    }
}

// ===== RecordingMailer =====

/// 送信されたメールを記録する Mailer
///
/// インスタンスごとに記録を持つため、並行テスト間で干渉しない。
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent:    Arc<Mutex<Vec<EmailMessage>>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に送信失敗を返す Mailer（失敗時も記録はしない）
    pub fn failing() -> Self {
        Self {
            sent:    Arc::new(Mutex::new(Vec::new())),
            failing: true,
        }
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn latest(&self) -> Option<EmailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::SendFailed(
                "RecordingMailer: 送信失敗".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ===== InMemorySessionManager =====

#[derive(Clone, Default)]
pub struct InMemorySessionManager {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 発行済みセッションとして登録する
    pub fn insert(&self, session_id: impl Into<String>, data: SessionData) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.into(), data);
    }
}

#[async_trait]
impl SessionManager for InMemorySessionManager {
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }
}
