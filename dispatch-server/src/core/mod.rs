//! 核心模块 - 配置、状态和后台任务
//!
//! - [`Config`] - 服务配置
//! - [`ServerState`] - 服务装配 (pool, coordinator, managers)
//! - [`BackgroundTasks`] - 后台任务生命周期

pub mod config;
pub mod state;
pub mod tasks;

pub use config::{Config, ConfigError};
pub use state::ServerState;
pub use tasks::BackgroundTasks;
