//! 共享库
//!
//! 包含奖励核心各组件共用的配置、错误处理、数据库连接和日志初始化代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;

pub use config::{AppConfig, DatabaseConfig, ObservabilityConfig, RewardsConfig};
pub use database::Database;
pub use error::{SharedError, SharedResult};
