//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//!
//! | 環境変数 | 値 | デフォルト |
//! |---------|----|-----------|
//! | `LOG_FORMAT` | `json` / `pretty`（大文字小文字は区別しない） | `pretty` |
//! | `RUST_LOG` | EnvFilter のディレクティブ | [`DEFAULT_FILTER`] |

use std::str::FromStr;

/// `RUST_LOG` 未設定時のフィルタ
///
/// ワークスペースのクレートは debug、依存クレートは info。
pub const DEFAULT_FILTER: &str =
    "info,kagi_identity_service=debug,kagi_infra=debug,kagi_domain=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// 1 イベント 1 行の JSON（ログ収集基盤向け）
    Json,
    /// 開発用
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` の値を解釈する
    ///
    /// 未設定は [`Pretty`](LogFormat::Pretty)。不正値も Pretty にするが、
    /// トレーシング初期化前なので警告は stderr に出す。
    pub fn from_value(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::default();
        };
        Self::from_str(value).unwrap_or_else(|_| {
            eprintln!("WARNING: unknown LOG_FORMAT={value:?}, falling back to pretty");
            Self::default()
        })
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 起動イベントの `service` フィールド
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    pub fn from_env(service_name: impl Into<String>) -> Self {
        let log_format = LogFormat::from_value(std::env::var("LOG_FORMAT").ok().as_deref());
        Self::new(service_name, log_format)
    }
}

/// トレーシングを初期化する
///
/// `ErrorLayer` を登録するので、`InfraError` の SpanTrace に呼び出し経路が記録される。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::info!(
        service = %config.service_name,
        log_format = %config.log_format,
        "トレーシングを初期化しました"
    );
}
