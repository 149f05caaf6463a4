//! # Identity Service サーバー
//!
//! ユーザーのメールアドレス管理とセキュリティ通知を担当する API サーバー。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `IDENTITY_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `IDENTITY_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REDIS_URL` | No | セッション参照用 Redis（デフォルト: `redis://localhost:6379`） |
//! | `MAILER_BACKEND` | No | `smtp` / `noop`（デフォルト: `noop`） |
//!
//! 通知関連の変数は [`config`](kagi_identity_service::config) を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! IDENTITY_PORT=13010 DATABASE_URL=postgres://... cargo run -p kagi-identity-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use kagi_identity_service::{
    app_builder::{build_app, build_email_state, build_mailer},
    config::IdentityConfig,
};
use kagi_infra::{
    RedisSessionManager,
    SessionManager,
    db,
    repository::{EmailRepository, PostgresEmailRepository},
};
use kagi_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Identity Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("identity-service"));
    let _tracing_guard = tracing::info_span!("app", service = "identity-service").entered();

    let config = IdentityConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Identity Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;
    tracing::info!("マイグレーションを適用しました");

    let session_manager: Arc<dyn SessionManager> = Arc::new(
        RedisSessionManager::new(&config.redis_url)
            .await
            .context("Redis 接続に失敗しました")?,
    );
    tracing::info!("Redis に接続しました");

    let email_repository: Arc<dyn EmailRepository> =
        Arc::new(PostgresEmailRepository::new(pool));
    let mailer = build_mailer(&config.mailer);
    let email_state = build_email_state(&config, email_repository, session_manager, mailer)?;

    let app = build_app(email_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Identity Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
