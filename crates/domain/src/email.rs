//! # メールアドレス
//!
//! ユーザーに紐づくメールアドレスエンティティと、ユーザー単位のルールを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | ルール |
//! |---|------------|------|
//! | [`EmailAddress`] | メールアドレス（値オブジェクト） | 小文字正規化、`local@domain` 形式 |
//! | [`Email`] | 登録メールアドレス | 所有ユーザーとプライマリフラグを持つ |
//! | [`UserEmails`] | ユーザーのメールアドレス一覧 | プライマリは常に高々 1 件 |
//!
//! ## 設計方針
//!
//! - **ルールの集約**: 上限チェック・削除可否・プライマリ切り替えは [`UserEmails`] に集約し、
//!   ユースケース層はリポジトリとの橋渡しに専念する
//! - **所有権の隠蔽**: 他ユーザーのメールアドレスは「存在しない」として扱う

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, user::UserId};

define_uuid_id! {
    /// メールアドレス ID（一意識別子）
    pub struct EmailId;
}

/// メールアドレスの最大長
const MAX_ADDRESS_LENGTH: usize = 255;

/// メールアドレス（値オブジェクト）
///
/// 生成時に trim と小文字化を行い、同一アドレスの表記揺れを防ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - `local@domain` の形式（`@` はちょうど 1 つ）
    /// - 最大 255 文字
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.len() > MAX_ADDRESS_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは{MAX_ADDRESS_LENGTH}文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 登録メールアドレス（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    id:         EmailId,
    user_id:    UserId,
    address:    EmailAddress,
    is_primary: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Email {
    /// 新しいメールアドレスを作成する
    pub fn new(
        id: EmailId,
        user_id: UserId,
        address: EmailAddress,
        is_primary: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            address,
            is_primary,
            created_at: now,
            updated_at: now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(
        id: EmailId,
        user_id: UserId,
        address: EmailAddress,
        is_primary: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            address,
            is_primary,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &EmailId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn address(&self) -> &EmailAddress {
        &self.address
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_primary_flag(&mut self, is_primary: bool, now: DateTime<Utc>) {
        if self.is_primary != is_primary {
            self.is_primary = is_primary;
            self.updated_at = now;
        }
    }
}

/// プライマリメールアドレス切り替えの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryChange {
    /// 指定されたアドレスが既にプライマリだった
    AlreadyPrimary,
    /// プライマリが切り替わった
    Changed {
        /// 切り替え前のプライマリ（プライマリ未設定だった場合は `None`）
        previous: Option<EmailAddress>,
        /// 新しいプライマリ
        current:  EmailAddress,
    },
}

/// ユーザーのメールアドレス一覧
///
/// # 不変条件
///
/// - すべての要素が同一ユーザーに属する
/// - プライマリは高々 1 件
///
/// 並び順はプライマリが先頭、以降は作成日時の昇順。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEmails {
    user_id: UserId,
    emails:  Vec<Email>,
}

impl UserEmails {
    /// ユーザーのメールアドレス一覧を構築する
    ///
    /// 他ユーザーのメールアドレスが混入していた場合は除外する。
    pub fn new(user_id: UserId, emails: Vec<Email>) -> Self {
        let mut emails: Vec<Email> = emails
            .into_iter()
            .filter(|email| email.user_id() == &user_id)
            .collect();
        sort_primary_first(&mut emails);
        Self { user_id, emails }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Email> {
        self.emails.iter()
    }

    pub fn into_vec(self) -> Vec<Email> {
        self.emails
    }

    /// プライマリメールアドレスを返す
    pub fn primary(&self) -> Option<&Email> {
        self.emails.iter().find(|email| email.is_primary())
    }

    /// ID でメールアドレスを検索する
    pub fn find(&self, id: &EmailId) -> Option<&Email> {
        self.emails.iter().find(|email| email.id() == id)
    }

    /// メールアドレスを追加できるか検証する
    ///
    /// 既に `max_num_of_addresses` 件登録済みの場合は `Validation` エラー。
    pub fn ensure_can_add(&self, max_num_of_addresses: usize) -> Result<(), DomainError> {
        if self.emails.len() >= max_num_of_addresses {
            return Err(DomainError::Validation(format!(
                "登録できるメールアドレスは {max_num_of_addresses} 件までです"
            )));
        }
        Ok(())
    }

    /// 新しく追加するメールアドレスをプライマリにすべきか
    ///
    /// 最初の 1 件は自動的にプライマリになる。
    pub fn next_is_primary(&self) -> bool {
        self.primary().is_none()
    }

    /// メールアドレスを一覧に追加し、追加したメールアドレスを返す
    ///
    /// 登録上限を検証し、プライマリがなければ追加分をプライマリにする。
    /// アドレスの重複（全ユーザー横断）はここでは検証しない。
    pub fn add(
        &mut self,
        id: EmailId,
        address: EmailAddress,
        max_num_of_addresses: usize,
        now: DateTime<Utc>,
    ) -> Result<Email, DomainError> {
        self.ensure_can_add(max_num_of_addresses)?;

        let email = Email::new(
            id,
            self.user_id.clone(),
            address,
            self.next_is_primary(),
            now,
        );
        self.emails.push(email.clone());
        sort_primary_first(&mut self.emails);
        Ok(email)
    }

    /// メールアドレスを削除できるか検証し、削除対象を返す
    ///
    /// - 一覧に存在しない → `NotFound`
    /// - プライマリ → `Conflict`
    pub fn ensure_deletable(&self, id: &EmailId) -> Result<&Email, DomainError> {
        let email = self.find(id).ok_or_else(|| DomainError::NotFound {
            entity_type: "Email",
            id:          id.to_string(),
        })?;

        if email.is_primary() {
            return Err(DomainError::Conflict(
                "プライマリメールアドレスは削除できません".to_string(),
            ));
        }

        Ok(email)
    }

    /// 指定したメールアドレスをプライマリにする
    ///
    /// 対象のみを `is_primary = true` とし、それ以外をすべて `false` にする。
    pub fn set_primary(
        &mut self,
        id: &EmailId,
        now: DateTime<Utc>,
    ) -> Result<PrimaryChange, DomainError> {
        let target = self.find(id).ok_or_else(|| DomainError::NotFound {
            entity_type: "Email",
            id:          id.to_string(),
        })?;

        if target.is_primary() {
            return Ok(PrimaryChange::AlreadyPrimary);
        }

        let current = target.address().clone();
        let previous = self.primary().map(|email| email.address().clone());

        for email in &mut self.emails {
            let is_target = email.id() == id;
            email.set_primary_flag(is_target, now);
        }
        sort_primary_first(&mut self.emails);

        Ok(PrimaryChange::Changed { previous, current })
    }
}

/// プライマリを先頭に、以降は作成日時の昇順に並べる
fn sort_primary_first(emails: &mut [Email]) {
    emails.sort_by(|a, b| {
        b.is_primary()
            .cmp(&a.is_primary())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn make_email(user_id: &UserId, address: &str, is_primary: bool, offset_secs: i64) -> Email {
        let now = Utc::now() + Duration::seconds(offset_secs);
        Email::new(
            EmailId::new(),
            user_id.clone(),
            EmailAddress::new(address).unwrap(),
            is_primary,
            now,
        )
    }

    fn make_user_emails() -> (UserEmails, Vec<EmailId>) {
        let user_id = UserId::new();
        let emails = vec![
            make_email(&user_id, "primary@example.com", true, 0),
            make_email(&user_id, "second@example.com", false, 1),
            make_email(&user_id, "third@example.com", false, 2),
        ];
        let ids = emails.iter().map(|e| e.id().clone()).collect();
        (UserEmails::new(user_id, emails), ids)
    }

    #[test]
    fn メールアドレスは小文字に正規化される() {
        let address = EmailAddress::new("  Foo.Bar@Example.COM ").unwrap();
        assert_eq!(address.as_str(), "foo.bar@example.com");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("no-at-mark")]
    #[case("@example.com")]
    #[case("user@")]
    #[case("a@b@example.com")]
    fn 不正なメールアドレスはバリデーションエラー(#[case] input: &str) {
        let result = EmailAddress::new(input);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn 長すぎるメールアドレスはバリデーションエラー() {
        let local = "a".repeat(250);
        let result = EmailAddress::new(format!("{local}@example.com"));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn 一覧はプライマリが先頭で作成日時順に並ぶ() {
        let user_id = UserId::new();
        let emails = vec![
            make_email(&user_id, "late@example.com", false, 10),
            make_email(&user_id, "early@example.com", false, 1),
            make_email(&user_id, "primary@example.com", true, 5),
        ];

        let user_emails = UserEmails::new(user_id, emails);
        let addresses: Vec<&str> = user_emails.iter().map(|e| e.address().as_str()).collect();

        assert_eq!(
            addresses,
            vec![
                "primary@example.com",
                "early@example.com",
                "late@example.com"
            ]
        );
    }

    #[test]
    fn 他ユーザーのメールアドレスは一覧から除外される() {
        let user_id = UserId::new();
        let other = UserId::new();
        let emails = vec![
            make_email(&user_id, "mine@example.com", true, 0),
            make_email(&other, "theirs@example.com", true, 0),
        ];

        let user_emails = UserEmails::new(user_id, emails);

        assert_eq!(user_emails.len(), 1);
        assert_eq!(
            user_emails.primary().unwrap().address().as_str(),
            "mine@example.com"
        );
    }

    #[rstest]
    #[case(3, false)]
    #[case(4, true)]
    #[case(100, true)]
    fn 上限件数に達していると追加できない(#[case] max: usize, #[case] allowed: bool) {
        let (user_emails, _) = make_user_emails();
        assert_eq!(user_emails.ensure_can_add(max).is_ok(), allowed);
    }

    #[test]
    fn 最初の1件はプライマリになる() {
        let empty = UserEmails::new(UserId::new(), Vec::new());
        assert!(empty.next_is_primary());

        let (user_emails, _) = make_user_emails();
        assert!(!user_emails.next_is_primary());
    }

    #[test]
    fn 追加したメールアドレスは2件目以降プライマリにならない() {
        let user_id = UserId::new();
        let mut user_emails = UserEmails::new(user_id.clone(), Vec::new());

        let first = user_emails
            .add(
                EmailId::new(),
                EmailAddress::new("first@example.com").unwrap(),
                2,
                Utc::now(),
            )
            .unwrap();
        let second = user_emails
            .add(
                EmailId::new(),
                EmailAddress::new("second@example.com").unwrap(),
                2,
                Utc::now(),
            )
            .unwrap();
        let third = user_emails.add(
            EmailId::new(),
            EmailAddress::new("third@example.com").unwrap(),
            2,
            Utc::now(),
        );

        assert!(first.is_primary());
        assert!(!second.is_primary());
        assert_eq!(first.user_id(), &user_id);
        assert!(matches!(third, Err(DomainError::Validation(_))));
        assert_eq!(user_emails.len(), 2);
        assert_eq!(user_emails.iter().filter(|e| e.is_primary()).count(), 1);
    }

    #[test]
    fn プライマリ以外は削除できる() {
        let (user_emails, ids) = make_user_emails();

        let email = user_emails.ensure_deletable(&ids[1]).unwrap();

        assert_eq!(email.address().as_str(), "second@example.com");
    }

    #[test]
    fn プライマリは削除できない() {
        let (user_emails, ids) = make_user_emails();

        let result = user_emails.ensure_deletable(&ids[0]);

        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn 存在しないメールアドレスの削除はnot_found() {
        let (user_emails, _) = make_user_emails();

        let result = user_emails.ensure_deletable(&EmailId::new());

        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity_type: "Email",
                ..
            })
        ));
    }

    #[test]
    fn プライマリ切り替えで対象だけがプライマリになる() {
        let (mut user_emails, ids) = make_user_emails();

        let change = user_emails.set_primary(&ids[2], Utc::now()).unwrap();

        assert_eq!(
            change,
            PrimaryChange::Changed {
                previous: Some(EmailAddress::new("primary@example.com").unwrap()),
                current:  EmailAddress::new("third@example.com").unwrap(),
            }
        );
        let primaries: Vec<&EmailId> = user_emails
            .iter()
            .filter(|e| e.is_primary())
            .map(|e| e.id())
            .collect();
        assert_eq!(primaries, vec![&ids[2]]);
        assert_eq!(user_emails.primary().unwrap().id(), &ids[2]);
    }

    #[test]
    fn 既にプライマリならalready_primaryを返し変更しない() {
        let (mut user_emails, ids) = make_user_emails();
        let before = user_emails.clone();

        let change = user_emails.set_primary(&ids[0], Utc::now()).unwrap();

        assert_eq!(change, PrimaryChange::AlreadyPrimary);
        assert_eq!(user_emails, before);
    }

    #[test]
    fn プライマリ未設定からの切り替えではpreviousがnone() {
        let user_id = UserId::new();
        let email = make_email(&user_id, "only@example.com", false, 0);
        let id = email.id().clone();
        let mut user_emails = UserEmails::new(user_id, vec![email]);

        let change = user_emails.set_primary(&id, Utc::now()).unwrap();

        assert_eq!(
            change,
            PrimaryChange::Changed {
                previous: None,
                current:  EmailAddress::new("only@example.com").unwrap(),
            }
        );
    }

    #[test]
    fn 存在しないメールアドレスはプライマリにできない() {
        let (mut user_emails, _) = make_user_emails();

        let result = user_emails.set_primary(&EmailId::new(), Utc::now());

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
