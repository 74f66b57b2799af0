//! Test fixtures: a migrated SQLite database in a temp directory, a manual
//! clock, and a small seeded institution tree.

use crate::db::MIGRATOR;
use crate::utils::time::Clock;
use shared::models::Operator;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("dispatch.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();
        Self { pool, _dir: dir }
    }

    /// Pooled connection for direct repository calls.
    /// Drop it before calling into the coordinator.
    pub async fn conn(&self) -> PoolConnection<Sqlite> {
        self.pool.acquire().await.unwrap()
    }

    /// Seed the fixture tree:
    ///
    /// ```text
    /// org 1  platform   (root, certified)
    /// ├── org 5  school     (certified)
    /// │   └── org 6  branch (certified)
    /// ├── org 7  pending    (not certified)
    /// └── org 8  rival      (certified)
    /// user 3 publisher@1, user 4 staff@5, user 9 staff@8, user 8 author@1
    /// student 10 (telephone 13900000010, author 8, org 1)
    /// ```
    pub async fn seed(&self) -> Fixture {
        let stmts = [
            "INSERT INTO organization (id, name, parent_id, status, created_at, updated_at) VALUES (1, 'platform', NULL, 'CERTIFIED', 0, 0)",
            "INSERT INTO organization (id, name, parent_id, status, created_at, updated_at) VALUES (5, 'school', 1, 'CERTIFIED', 0, 0)",
            "INSERT INTO organization (id, name, parent_id, status, created_at, updated_at) VALUES (6, 'branch', 5, 'CERTIFIED', 0, 0)",
            "INSERT INTO organization (id, name, parent_id, status, created_at, updated_at) VALUES (7, 'pending', 1, 'PENDING', 0, 0)",
            "INSERT INTO organization (id, name, parent_id, status, created_at, updated_at) VALUES (8, 'rival', 1, 'CERTIFIED', 0, 0)",
            "INSERT INTO app_user (id, name, org_id, role_id, created_at, updated_at) VALUES (3, 'publisher', 1, 1, 0, 0)",
            "INSERT INTO app_user (id, name, org_id, role_id, created_at, updated_at) VALUES (4, 'school staff', 5, 2, 0, 0)",
            "INSERT INTO app_user (id, name, org_id, role_id, created_at, updated_at) VALUES (8, 'author', 1, 1, 0, 0)",
            "INSERT INTO app_user (id, name, org_id, role_id, created_at, updated_at) VALUES (9, 'rival staff', 8, 2, 0, 0)",
            "INSERT INTO student (id, name, telephone, author_id, org_id, source, status, created_at, updated_at) VALUES (10, 'Li Lei', '13900000010', 8, 1, 'web', 'FRESH', 0, 0)",
        ];
        for sql in stmts {
            sqlx::query(sql).execute(&self.pool).await.unwrap();
        }
        Fixture
    }
}

/// Ids of the seeded rows
pub struct Fixture;

impl Fixture {
    pub const ROOT_ORG: i64 = 1;
    pub const SCHOOL_ORG: i64 = 5;
    pub const BRANCH_ORG: i64 = 6;
    pub const PENDING_ORG: i64 = 7;
    pub const RIVAL_ORG: i64 = 8;
    pub const PUBLISHER: i64 = 3;
    pub const AUTHOR: i64 = 8;
    pub const STUDENT: i64 = 10;

    /// Root-level operator (the publisher)
    pub fn root(&self) -> Operator {
        Operator {
            user_id: Self::PUBLISHER,
            org_id: Self::ROOT_ORG,
            role_id: 1,
        }
    }

    /// Operator of the school that owns the orders
    pub fn school(&self) -> Operator {
        Operator {
            user_id: 4,
            org_id: Self::SCHOOL_ORG,
            role_id: 2,
        }
    }

    /// Operator of an unrelated institution
    pub fn rival(&self) -> Operator {
        Operator {
            user_id: 9,
            org_id: Self::RIVAL_ORG,
            role_id: 2,
        }
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// 2024-03-05 12:00:00 UTC
    pub const START: i64 = 1_709_640_000_000;

    pub fn new() -> Arc<Self> {
        Self::at(Self::START)
    }

    pub fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(millis),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.now
            .fetch_add(days * shared::util::DAY_MILLIS, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
