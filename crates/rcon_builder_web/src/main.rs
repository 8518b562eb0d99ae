use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use rcon_builder::{BuildService, Config, ConnectionGate, OpenAIChat, RconClient, SharedConsole};
use rcon_builder_web::{logging, router};

#[tokio::main]
async fn main() -> Result<()> {
    // エラーハンドリングの初期化
    color_eyre::install()?;

    // 設定のロード（.env → 環境変数）
    let config = Config::load().wrap_err("loading configuration")?;

    // ロギングの初期化（ガードはスコープ終了まで保持）
    let _log_guard = logging::init(config.server.log_dir.as_deref());

    tracing::info!(target: "rcon_builder_web", ?config, "Starting build server...");

    // RCON 接続は起動時に一度だけ確立する。失敗したら続行できない
    let console = RconClient::connect(&config.rcon)
        .await
        .wrap_err_with(|| format!("connecting to RCON at {}", config.rcon.host_port))?;
    let console: SharedConsole = Box::new(console);

    let model = OpenAIChat::new(config.openai.clone()).wrap_err("building OpenAI client")?;

    let service = Arc::new(BuildService::new(
        ConnectionGate::new(console),
        Arc::new(model),
        config.server.parse_mode,
        config.server.request_timeout,
    ));

    let app = router(service);

    // サーバー起動
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .wrap_err_with(|| format!("binding {}", config.server.bind_addr))?;

    let addr = listener.local_addr()?;
    tracing::info!(target: "rcon_builder_web", "Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "rcon_builder_web", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "rcon_builder_web", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
