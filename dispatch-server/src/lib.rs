//! Dispatch Server - 派单核心服务
//!
//! # 架构概述
//!
//! 招生派单系统的核心：把生源 (student) 派给机构 (organization)，跟踪派单
//! 生命周期、收退款确认、统计台账和撞单处理。HTTP 等外层接口不在本 crate 内。
//!
//! # 模块结构
//!
//! ```text
//! dispatch-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── db/            # SQLite 连接池、迁移、repository
//! ├── tx/            # 事务协调器 (deadline + panic containment)
//! ├── orders/        # 派单生命周期、收退款、备注
//! ├── statistics/    # 统计台账与汇总
//! ├── conflicts/     # 生源录入与撞单处理
//! ├── notify/        # 通知广播与投递
//! └── utils/         # 日志、时间、校验
//! ```

pub mod conflicts;
pub mod core;
pub mod db;
pub mod error;
pub mod notify;
pub mod orders;
pub mod statistics;
pub mod tx;
pub mod utils;

#[cfg(test)]
pub mod testing;

pub use conflicts::ConflictResolver;
pub use core::{Config, ServerState};
pub use error::{DispatchError, DispatchResult};
pub use notify::NotifyHub;
pub use orders::OrderManager;
pub use statistics::StatisticsLedger;
pub use tx::TxCoordinator;
pub use utils::logger::{cleanup_old_logs, init_logger};
