//! メールアドレス管理ユースケース
//!
//! 通知の送信失敗はメールアドレス操作の結果に影響させない（警告ログのみ）。

use std::sync::Arc;

use chrono::Utc;
use kagi_domain::{
    email::{Email, EmailAddress, EmailId, PrimaryChange, UserEmails},
    notification::SecurityNotification,
    user::UserId,
};
use kagi_infra::{
    InfraError,
    repository::{EmailInsertion, EmailRepository, PRIMARY_EMAIL_CONFLICT},
};

use super::NotificationService;
use crate::error::IdentityError;

/// メールアドレス管理ユースケース
pub struct EmailUseCaseImpl {
    email_repository:     Arc<dyn EmailRepository>,
    notification_service: Arc<NotificationService>,
    max_num_of_addresses: usize,
}

impl EmailUseCaseImpl {
    pub fn new(
        email_repository: Arc<dyn EmailRepository>,
        notification_service: Arc<NotificationService>,
        max_num_of_addresses: usize,
    ) -> Self {
        Self {
            email_repository,
            notification_service,
            max_num_of_addresses,
        }
    }

    async fn load_user_emails(&self, user_id: &UserId) -> Result<UserEmails, IdentityError> {
        let emails = self.email_repository.find_by_user_id(user_id).await?;
        Ok(UserEmails::new(user_id.clone(), emails))
    }

    /// ユーザーのメールアドレス一覧を取得する
    pub async fn list_emails(&self, user_id: &UserId) -> Result<UserEmails, IdentityError> {
        self.load_user_emails(user_id).await
    }

    /// メールアドレスを追加する
    ///
    /// 1. アドレスの形式を検証
    /// 2. ユーザー単位の排他の中で登録上限を検証し挿入（最初の 1 件はプライマリ）
    /// 3. 既に登録済みのアドレスなら Conflict
    /// 4. 追加前のプライマリへ追加通知
    pub async fn create_email(
        &self,
        user_id: &UserId,
        address: &str,
        accept_language: Option<&str>,
    ) -> Result<Email, IdentityError> {
        let address = EmailAddress::new(address)?;

        let insertion = self
            .email_repository
            .insert_for_user(
                user_id,
                EmailId::new(),
                address,
                self.max_num_of_addresses,
                Utc::now(),
            )
            .await
            .map_err(map_conflict)?;

        let (email, primary) = match insertion {
            EmailInsertion::Inserted { email, primary } => (email, primary),
            EmailInsertion::Rejected(e) => return Err(e.into()),
        };

        if let Some(primary) = primary {
            let notification = SecurityNotification::EmailCreate {
                new_address: email.address().to_string(),
            };
            self.notify(&primary, accept_language, &notification).await;
        }

        Ok(email)
    }

    /// プライマリメールアドレスを切り替える
    ///
    /// 既にプライマリの場合は何もしない。切り替えた場合は旧プライマリへ通知する。
    pub async fn set_primary_email(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        accept_language: Option<&str>,
    ) -> Result<(), IdentityError> {
        let mut user_emails = self.load_user_emails(user_id).await?;
        let now = Utc::now();

        let PrimaryChange::Changed { previous, current } =
            user_emails.set_primary(email_id, now)?
        else {
            return Ok(());
        };

        let updated = self
            .email_repository
            .set_primary(user_id, email_id, now)
            .await
            .map_err(map_conflict)?;
        if !updated {
            return Err(IdentityError::NotFound(format!(
                "Email が見つかりません: {email_id}"
            )));
        }

        if let Some(previous) = previous {
            let notification = SecurityNotification::PrimaryEmailUpdate {
                old_address: previous.to_string(),
                new_address: current.to_string(),
            };
            self.notify(&previous, accept_language, &notification).await;
        }

        Ok(())
    }

    /// メールアドレスを削除する
    ///
    /// プライマリメールアドレスは削除できない。
    pub async fn delete_email(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
    ) -> Result<(), IdentityError> {
        let user_emails = self.load_user_emails(user_id).await?;
        user_emails.ensure_deletable(email_id)?;

        let deleted = self.email_repository.delete(user_id, email_id).await?;
        if !deleted {
            return Err(IdentityError::NotFound(format!(
                "Email が見つかりません: {email_id}"
            )));
        }

        Ok(())
    }

    async fn notify(
        &self,
        to: &EmailAddress,
        accept_language: Option<&str>,
        notification: &SecurityNotification,
    ) {
        if let Err(e) = self
            .notification_service
            .send(to.as_str(), accept_language, notification)
            .await
        {
            tracing::warn!(
                error = %e,
                notification.kind = %notification.kind(),
                "セキュリティ通知の送信に失敗（操作は継続）"
            );
        }
    }
}

/// リポジトリの Conflict をエンティティ名に応じたメッセージに変換する
fn map_conflict(error: InfraError) -> IdentityError {
    match error.as_conflict() {
        Some((PRIMARY_EMAIL_CONFLICT, _)) => IdentityError::Conflict(
            "プライマリメールアドレスの変更が他の操作と競合しました".to_string(),
        ),
        Some(_) => IdentityError::Conflict(
            "このメールアドレスは既に使用されています".to_string(),
        ),
        None => IdentityError::Database(error),
    }
}
