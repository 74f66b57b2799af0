use dispatch_server::core::tasks::HEALTH_CHECK_INTERVAL;
use dispatch_server::notify::LogDelivery;
use dispatch_server::{Config, ServerState, init_logger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env()?;

    // 3. 日志
    init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    tracing::info!(environment = %config.environment, "Dispatch server starting...");

    // 4. 数据库 + 服务装配
    let state = ServerState::initialize(&config).await?;

    // 5. 后台任务
    let tasks = state.start_background_tasks(Arc::new(LogDelivery));
    tracing::info!(tasks = tasks.len(), "Background tasks started");

    // 6. 等待 Ctrl-C，期间定期检查后台任务
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health.tick().await;
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            _ = health.tick(), if !tasks.is_empty() => {
                let failed = tasks.check_health();
                if failed > 0 {
                    tracing::warn!(failed, total = tasks.len(), "Background tasks unhealthy");
                }
            }
        }
    }
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    state.pool.close().await;
    tracing::info!("Dispatch server stopped");
    Ok(())
}
