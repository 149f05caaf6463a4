//! # ユーザー
//!
//! ユーザー本体の管理は別サービスの責務。このクレートでは
//! メールアドレスの所有者を指す識別子のみを扱う。

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    ///
    /// セッションから取り出され、メールアドレスの所有者を表す。
    pub struct UserId;
}
