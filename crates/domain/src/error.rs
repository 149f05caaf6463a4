//! # ドメイン層エラー定義
//!
//! ビジネスルール違反を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗、登録上限超過 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない、または他ユーザーの所有 |
//! | `Conflict` | 409 Conflict | 重複登録、プライマリメールアドレスの削除 |

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// API 層でこのエラーを受け取り、HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// - メールアドレスの形式不正
    /// - ユーザーあたりの登録上限超過
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Email" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー
    ///
    /// 既に登録済みのアドレスの追加や、プライマリメールアドレスの削除で発生する。
    #[error("競合が発生しました: {0}")]
    Conflict(String),
}
