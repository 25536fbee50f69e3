//! 奖励核心启动入口
//!
//! 加载配置、初始化日志、建立数据库连接并应用迁移，
//! 完成存储就绪检查后组装门面服务，供上层收银工作流嵌入。

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use rewards_core::registry::StaticProgramRegistry;
use rewards_core::service::RewardsService;
use rewards_shared::{config::AppConfig, database::Database, observability};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 统一加载配置：config/ 下的分层文件 + REWARDS__ 环境变量覆盖
    let config = AppConfig::load("rewards-core").unwrap_or_else(|e| {
        tracing::warn!("加载配置失败，使用默认配置: {}", e);
        AppConfig::default()
    });

    // 2. 初始化日志
    observability::init(&config.observability)?;
    info!(environment = %config.environment, "配置加载完成");

    // 3. 初始化数据库连接并应用迁移
    let db = Database::connect(&config.database).await?;
    sqlx::migrate!("./migrations").run(db.pool()).await?;
    db.health_check().await?;
    info!("数据库迁移与健康检查完成");

    // 4. 组装门面服务（计划目录由上层接入主数据后填充）
    let registry = Arc::new(StaticProgramRegistry::new());
    let _service = RewardsService::with_postgres(&db, registry, &config.rewards);
    info!("奖励核心就绪");

    db.close().await;
    Ok(())
}
