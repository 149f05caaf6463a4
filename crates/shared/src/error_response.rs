//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! `type` は [`ProblemType`] から組み立てる。
//! 種別・タイトル・ステータスの組は [`ProblemType`] の 1 箇所で定義し、
//! 呼び出し側は種別と詳細メッセージだけを渡す。

use serde::{Deserialize, Serialize};

/// `type` URI のベース
const PROBLEM_TYPE_BASE: &str = "https://kagi.example.com/errors";

/// 問題の種別
///
/// URI のサフィックスは kebab-case（例: `validation-error`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ProblemType {
    /// 入力値が不正（アドレス形式、登録上限、パスの ID 形式）
    ValidationError,
    /// セッション Cookie がない、またはセッションが存在しない
    Unauthorized,
    /// 対象がない、または他ユーザーのもの
    NotFound,
    /// アドレスの重複、プライマリの削除、プライマリ変更の競合
    Conflict,
    InternalError,
}

impl ProblemType {
    pub fn status(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InternalError => 500,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::ValidationError => "Validation Error",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "Not Found",
            Self::Conflict => "Conflict",
            Self::InternalError => "Internal Server Error",
        }
    }

    /// `type` フィールドに入れる URI
    pub fn uri(self) -> String {
        let suffix: &'static str = self.into();
        format!("{PROBLEM_TYPE_BASE}/{suffix}")
    }
}

/// エラーレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    pub fn new(problem: ProblemType, detail: impl Into<String>) -> Self {
        Self {
            error_type: problem.uri(),
            title:      problem.title().to_string(),
            status:     problem.status(),
            detail:     detail.into(),
        }
    }

    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::new(ProblemType::ValidationError, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(ProblemType::Unauthorized, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ProblemType::NotFound, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(ProblemType::Conflict, detail)
    }

    /// 500 Internal Server Error
    ///
    /// detail は固定値。原因はログにのみ出す。
    pub fn internal_error() -> Self {
        Self::new(ProblemType::InternalError, "内部エラーが発生しました")
    }
}
