use crate::conflicts::ConflictResolver;
use crate::core::{BackgroundTasks, Config};
use crate::db::DbService;
use crate::notify::{NotifyDelivery, NotifyHub, NotifyWorker};
use crate::orders::OrderManager;
use crate::statistics::StatisticsLedger;
use crate::tx::TxCoordinator;
use crate::utils::time::{SharedClock, SystemClock};
use sqlx::SqlitePool;
use std::sync::Arc;

/// 服务状态 - 持有所有服务的共享引用
///
/// 所有服务都在这里构造一次并以参数注入，没有全局单例。
/// Clone 是浅拷贝 (pool / Arc / broadcast sender)。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | coordinator | 事务协调器 |
/// | hub | 通知广播 |
/// | ledger | 统计台账 |
/// | orders | 派单生命周期 |
/// | conflicts | 生源撞单处理 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub clock: SharedClock,
    pub coordinator: TxCoordinator,
    pub hub: NotifyHub,
    pub ledger: StatisticsLedger,
    pub orders: OrderManager,
    pub conflicts: ConflictResolver,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("orders", &self.orders)
            .field("conflicts", &self.conflicts)
            .finish()
    }
}

impl ServerState {
    /// Wire every service on an open pool
    pub fn new(config: Config, pool: SqlitePool, clock: SharedClock) -> Self {
        let coordinator = TxCoordinator::new(pool.clone(), config.tx_timeout);
        let hub = NotifyHub::new(config.notify_channel_capacity);
        let ledger = StatisticsLedger::new(pool.clone(), clock.clone(), config.timezone);
        let orders = OrderManager::new(coordinator.clone(), ledger.clone(), hub.clone(), clock.clone());
        let conflicts = ConflictResolver::new(
            coordinator.clone(),
            ledger.clone(),
            clock.clone(),
            config.challenge_window_days,
        );

        Self {
            config,
            pool,
            clock,
            coordinator,
            hub,
            ledger,
            orders,
            conflicts,
        }
    }

    /// 初始化服务状态: 打开数据库、执行迁移、装配服务
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let db = DbService::new(&config.database_url, config.db_max_connections).await?;
        tracing::info!(
            tx_timeout_ms = config.tx_timeout.as_millis() as u64,
            challenge_window_days = config.challenge_window_days,
            timezone = %config.timezone,
            "Dispatch services ready"
        );
        Ok(Self::new(config.clone(), db.pool, Arc::new(SystemClock)))
    }

    /// 启动后台任务 (通知投递)
    pub fn start_background_tasks(&self, delivery: Arc<dyn NotifyDelivery>) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let worker = NotifyWorker::new(self.hub.clone(), delivery, tasks.shutdown_token());
        tasks.spawn("notify_worker", worker.run());
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogDelivery;
    use crate::testing::{Fixture, ManualClock, TestDb};
    use shared::models::{OrderCreate, PayDecision, PaymentRequest, StudentCreate, StudentStatus};

    #[tokio::test]
    async fn wired_services_share_one_ledger() {
        let db = TestDb::new().await;
        let fx = db.seed().await;
        let config = Config {
            timezone: chrono_tz::UTC,
            ..Config::default()
        };
        let state = ServerState::new(config, db.pool.clone(), ManualClock::new());
        let mut rx = state.hub.subscribe();
        let tasks = state.start_background_tasks(Arc::new(LogDelivery));
        assert_eq!(tasks.len(), 1);

        let intake = state
            .conflicts
            .create_student(
                StudentCreate {
                    name: "Han Meimei".into(),
                    telephone: "13600000000".into(),
                    source: "fair".into(),
                },
                &fx.school(),
            )
            .await
            .unwrap();
        assert_eq!(intake.student.status, StudentStatus::Fresh);

        let created = state
            .orders
            .create_order(
                OrderCreate {
                    student_id: intake.student.id,
                    org_id: Fixture::BRANCH_ORG,
                    subjects: vec!["Physics".into(), "Chemistry".into()],
                },
                &fx.school(),
            )
            .await
            .unwrap();
        let signed = state
            .orders
            .sign_up_order(
                created.id,
                PaymentRequest {
                    amount: 2000,
                    title: "deposit".into(),
                },
                &fx.school(),
            )
            .await
            .unwrap();
        state
            .orders
            .confirm_payment(signed.pay_record.id, PayDecision::Confirmed, &fx.root())
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().order_id, created.id);

        let summary = state.ledger.summary(&[Fixture::SCHOOL_ORG]).await.unwrap();
        assert_eq!(summary.student_count, 1);
        assert_eq!(summary.performance, 2000);
        assert_eq!(summary.success_rate, 10_000);

        // The notify worker is still running after handling traffic
        assert_eq!(tasks.check_health(), 0);
        tasks.shutdown().await;
    }
}
