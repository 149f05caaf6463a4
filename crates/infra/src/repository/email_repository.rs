//! # EmailRepository
//!
//! メールアドレスの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **ユーザースコープ**: 更新・削除は `user_id` を条件に含め、他ユーザーの行に触れない
//! - **追加の排他**: 追加はユーザー単位の advisory lock を取った 1 トランザクションで行い、
//!   登録上限とプライマリ判定を排他中に読み直した一覧で決める
//! - **プライマリの一意性**: `emails_user_primary_idx`（部分一意インデックス）で保証し、
//!   切り替えは 1 トランザクションで行う
//! - **一意制約違反**: 違反した制約名で [`EMAIL_CONFLICT`] と [`PRIMARY_EMAIL_CONFLICT`] を
//!   区別して [`InfraErrorKind::Conflict`] に変換する
//!
//! [`InfraErrorKind::Conflict`]: crate::error::InfraErrorKind::Conflict

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kagi_domain::{
    DomainError,
    email::{Email, EmailAddress, EmailId, UserEmails},
    user::UserId,
};
use sqlx::{FromRow, PgPool, postgres::PgExecutor};
use uuid::Uuid;

use crate::error::InfraError;

/// アドレス重複の Conflict エンティティ名
pub const EMAIL_CONFLICT: &str = "Email";

/// プライマリ重複の Conflict エンティティ名
pub const PRIMARY_EMAIL_CONFLICT: &str = "PrimaryEmail";

const PRIMARY_INDEX: &str = "emails_user_primary_idx";

/// メールアドレス追加の結果
#[derive(Debug)]
pub enum EmailInsertion {
    /// 追加した
    Inserted {
        email:   Email,
        /// 追加前のプライマリ（追加分がプライマリになった場合は `None`）
        primary: Option<EmailAddress>,
    },
    /// ドメインの規則（登録上限など）により追加しなかった
    Rejected(DomainError),
}

/// メールアドレスリポジトリトレイト
#[async_trait]
pub trait EmailRepository: Send + Sync {
    /// ユーザーのメールアドレスをすべて取得する
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Email>, InfraError>;

    /// ユーザー単位で排他してメールアドレスを追加する
    ///
    /// 排他の取得後にユーザーの一覧を読み直し、[`UserEmails::add`] で
    /// 登録上限とプライマリを決めてから挿入する。
    /// アドレスが既に登録済みの場合は `Conflict`（[`EMAIL_CONFLICT`]）を返す。
    async fn insert_for_user(
        &self,
        user_id: &UserId,
        id: EmailId,
        address: EmailAddress,
        max_num_of_addresses: usize,
        now: DateTime<Utc>,
    ) -> Result<EmailInsertion, InfraError>;

    /// 指定したメールアドレスをユーザーの唯一のプライマリにする
    ///
    /// 対象がユーザーのものでない場合は何も変更せず `false` を返す。
    /// 並行した切り替えと衝突した場合は `Conflict`（[`PRIMARY_EMAIL_CONFLICT`]）を返す。
    async fn set_primary(
        &self,
        user_id: &UserId,
        id: &EmailId,
        now: DateTime<Utc>,
    ) -> Result<bool, InfraError>;

    /// ユーザーのメールアドレスを削除する
    ///
    /// 削除した場合は `true`、該当行がなかった場合は `false` を返す。
    async fn delete(&self, user_id: &UserId, id: &EmailId) -> Result<bool, InfraError>;
}

/// DB の行
#[derive(Debug, FromRow)]
struct EmailRow {
    id:         Uuid,
    user_id:    Uuid,
    address:    String,
    is_primary: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EmailRow> for Email {
    type Error = InfraError;

    fn try_from(row: EmailRow) -> Result<Self, Self::Error> {
        let address = EmailAddress::new(row.address)
            .map_err(|e| InfraError::unexpected(format!("不正なメールアドレスが保存されています: {e}")))?;
        Ok(Email::from_db(
            EmailId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            address,
            row.is_primary,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// 一意制約違反を Conflict に変換する
///
/// `emails_user_primary_idx` 違反はプライマリの重複、それ以外はアドレスの重複とみなす。
fn map_unique_violation(error: sqlx::Error, user_id: &UserId, duplicated: &str) -> InfraError {
    let constraint = match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            Some(db_error.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    };

    match constraint.as_deref() {
        Some(PRIMARY_INDEX) => InfraError::conflict(PRIMARY_EMAIL_CONFLICT, user_id.to_string()),
        Some(_) => InfraError::conflict(EMAIL_CONFLICT, duplicated),
        None => error.into(),
    }
}

async fn select_by_user_id<'e, E>(executor: E, user_id: &UserId) -> Result<Vec<Email>, InfraError>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<EmailRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, address, is_primary, created_at, updated_at
        FROM emails
        WHERE user_id = $1
        ORDER BY is_primary DESC, created_at ASC
        "#,
    )
    .bind(user_id.as_uuid())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Email::try_from).collect()
}

/// PostgreSQL 実装の EmailRepository
#[derive(Debug, Clone)]
pub struct PostgresEmailRepository {
    pool: PgPool,
}

impl PostgresEmailRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailRepository for PostgresEmailRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Email>, InfraError> {
        select_by_user_id(&self.pool, user_id).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id, %id))]
    async fn insert_for_user(
        &self,
        user_id: &UserId,
        id: EmailId,
        address: EmailAddress,
        max_num_of_addresses: usize,
        now: DateTime<Utc>,
    ) -> Result<EmailInsertion, InfraError> {
        let mut tx = self.pool.begin().await?;

        // 行が 0 件でも排他できるよう、行ロックではなくユーザー単位の advisory lock を取る
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

        let emails = select_by_user_id(&mut *tx, user_id).await?;
        let mut user_emails = UserEmails::new(user_id.clone(), emails);
        let primary = user_emails.primary().map(|email| email.address().clone());

        let email = match user_emails.add(id, address, max_num_of_addresses, now) {
            Ok(email) => email,
            Err(e) => {
                tx.rollback().await?;
                return Ok(EmailInsertion::Rejected(e));
            }
        };

        sqlx::query(
            r#"
            INSERT INTO emails (id, user_id, address, is_primary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(email.id().as_uuid())
        .bind(email.user_id().as_uuid())
        .bind(email.address().as_str())
        .bind(email.is_primary())
        .bind(email.created_at())
        .bind(email.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, user_id, email.address().as_str()))?;

        tx.commit().await?;
        Ok(EmailInsertion::Inserted { email, primary })
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id, %id))]
    async fn set_primary(
        &self,
        user_id: &UserId,
        id: &EmailId,
        now: DateTime<Utc>,
    ) -> Result<bool, InfraError> {
        let mut tx = self.pool.begin().await?;

        // 部分一意インデックスは行単位で検査されるため、先に旧プライマリを外す
        sqlx::query(
            r#"
            UPDATE emails
            SET is_primary = FALSE, updated_at = $3
            WHERE user_id = $1 AND is_primary AND id <> $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE emails
            SET is_primary = TRUE, updated_at = $3
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, user_id, &id.to_string()))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id, %id))]
    async fn delete(&self, user_id: &UserId, id: &EmailId) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            DELETE FROM emails
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
