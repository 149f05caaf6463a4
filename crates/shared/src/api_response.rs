//! # API レスポンスエンベロープ
//!
//! 公開 API の統一レスポンス形式 `{ "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// 公開 API の統一レスポンス型
///
/// `/emails` 系エンドポイントはすべてこの形式でボディを返す。
/// 統合テストでは `Deserialize` でレスポンスを復元して検証する。
///
/// ## 使用例
///
/// ```
/// use kagi_shared::ApiResponse;
///
/// let response = ApiResponse::new(vec!["primary@example.com"]);
/// assert_eq!(response.data.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
