//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールの件名と本文を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **本文**: `templates/email/{言語}/{テンプレート ID}.{txt|html}`。`.html` は自動エスケープされる
//! - **件名**: `locales/{言語}.json` のメッセージ ID → tera テンプレート文字列
//! - **フォールバック**: `Accept-Language` の候補順に探し、最後にデフォルト言語を使う

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    error::Error as _,
};

use kagi_domain::notification::NotificationError;
use tera::{Context, Tera};

use super::language::candidate_languages;

/// 対応言語
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "ja"];

/// 本文テンプレート（言語, ファイル名, 内容）
const BODY_TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "en",
        "login.txt",
        include_str!("../../../templates/email/en/login.txt"),
    ),
    (
        "en",
        "password_update.html",
        include_str!("../../../templates/email/en/password_update.html"),
    ),
    (
        "en",
        "primary_email_update.html",
        include_str!("../../../templates/email/en/primary_email_update.html"),
    ),
    (
        "en",
        "email_create.html",
        include_str!("../../../templates/email/en/email_create.html"),
    ),
    (
        "en",
        "passkey_create.html",
        include_str!("../../../templates/email/en/passkey_create.html"),
    ),
    (
        "ja",
        "login.txt",
        include_str!("../../../templates/email/ja/login.txt"),
    ),
    (
        "ja",
        "password_update.html",
        include_str!("../../../templates/email/ja/password_update.html"),
    ),
    (
        "ja",
        "primary_email_update.html",
        include_str!("../../../templates/email/ja/primary_email_update.html"),
    ),
    (
        "ja",
        "email_create.html",
        include_str!("../../../templates/email/ja/email_create.html"),
    ),
    (
        "ja",
        "passkey_create.html",
        include_str!("../../../templates/email/ja/passkey_create.html"),
    ),
];

/// 件名メッセージ（言語, JSON）
const SUBJECT_MESSAGES: &[(&str, &str)] = &[
    ("en", include_str!("../../../locales/en.json")),
    ("ja", include_str!("../../../locales/ja.json")),
];

/// tera エラーを原因まで含めて文字列化する
fn template_failed(error: tera::Error) -> NotificationError {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    NotificationError::TemplateFailed(message)
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、言語フォールバック付きで
/// 件名と本文を生成する。
pub struct TemplateRenderer {
    engine:           Tera,
    /// `{言語}/{テンプレート ID}` → tera 上のテンプレート名
    bodies:           HashMap<String, String>,
    /// `{言語}::{メッセージ ID}`
    subjects:         HashSet<String>,
    default_language: String,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `default_language` が対応言語でない場合はエラー。
    pub fn new(default_language: &str) -> Result<Self, NotificationError> {
        let default_language = default_language.to_ascii_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&default_language.as_str()) {
            return Err(NotificationError::TemplateFailed(format!(
                "未対応のデフォルト言語: {default_language}"
            )));
        }

        let mut raw_templates: Vec<(String, String)> = Vec::new();
        let mut bodies = HashMap::new();
        for (lang, file_name, source) in BODY_TEMPLATES {
            let template_id = file_name
                .rsplit_once('.')
                .map_or(*file_name, |(stem, _)| stem);
            let name = format!("{lang}/{file_name}");
            bodies.insert(format!("{lang}/{template_id}"), name.clone());
            raw_templates.push((name, (*source).to_string()));
        }

        let mut subjects = HashSet::new();
        for (lang, json) in SUBJECT_MESSAGES {
            let messages: BTreeMap<String, String> = serde_json::from_str(json).map_err(|e| {
                NotificationError::TemplateFailed(format!("件名メッセージの読み込みに失敗 ({lang}): {e}"))
            })?;
            for (message_id, template) in messages {
                let name = format!("{lang}::{message_id}");
                subjects.insert(name.clone());
                raw_templates.push((name, template));
            }
        }

        let mut engine = Tera::default();
        engine
            .add_raw_templates(raw_templates)
            .map_err(template_failed)?;

        Ok(Self {
            engine,
            bodies,
            subjects,
            default_language,
        })
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// 本文をレンダリングする
    ///
    /// 候補言語のうち最初にテンプレートが存在する言語を使う。
    pub fn render(
        &self,
        template_id: &str,
        accept_language: Option<&str>,
        context: &Context,
    ) -> Result<String, NotificationError> {
        for lang in candidate_languages(accept_language, &self.default_language) {
            if let Some(name) = self.bodies.get(&format!("{lang}/{template_id}")) {
                return self
                    .engine
                    .render(name, context)
                    .map_err(template_failed);
            }
        }
        Err(NotificationError::TemplateNotFound(template_id.to_string()))
    }

    /// 件名などの短いメッセージを翻訳する
    pub fn translate(
        &self,
        accept_language: Option<&str>,
        message_id: &str,
        context: &Context,
    ) -> Result<String, NotificationError> {
        for lang in candidate_languages(accept_language, &self.default_language) {
            let name = format!("{lang}::{message_id}");
            if self.subjects.contains(&name) {
                return self
                    .engine
                    .render(&name, context)
                    .map(|subject| subject.trim().to_string())
                    .map_err(template_failed);
            }
        }
        Err(NotificationError::TemplateNotFound(message_id.to_string()))
    }
}
