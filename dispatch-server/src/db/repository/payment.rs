//! Pay Record Repository

use super::{RepoError, RepoResult, push_in_filter};
use shared::models::{PayMode, PayRecord, PayStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT_PAY: &str =
    "SELECT id, order_id, mode, title, amount, status, created_at, updated_at FROM pay_record";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<PayRecord>> {
    let record = sqlx::query_as::<_, PayRecord>(&format!("{SELECT_PAY} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

/// Append a pending pay record
pub async fn create(
    conn: &mut SqliteConnection,
    order_id: i64,
    mode: PayMode,
    title: &str,
    amount: i64,
    now: i64,
) -> RepoResult<PayRecord> {
    if amount < 0 {
        return Err(RepoError::Validation(format!(
            "amount cannot be negative: {amount}"
        )));
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO pay_record (order_id, mode, title, amount, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5, ?5) RETURNING id",
    )
    .bind(order_id)
    .bind(mode)
    .bind(title)
    .bind(amount)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create pay record".into()))
}

pub async fn list_by_order(conn: &mut SqliteConnection, order_id: i64) -> RepoResult<Vec<PayRecord>> {
    let records = sqlx::query_as::<_, PayRecord>(&format!(
        "{SELECT_PAY} WHERE order_id = ? ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(records)
}

/// Decide a pending record (compare-and-set on PENDING); returns false when
/// the record was already decided
pub async fn decide(
    conn: &mut SqliteConnection,
    id: i64,
    status: PayStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE pay_record SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'PENDING'",
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Confirmed charges minus confirmed refunds for orders of `org_ids` (all when empty)
pub async fn net_confirmed(conn: &mut SqliteConnection, org_ids: &[i64]) -> RepoResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COALESCE(SUM(CASE p.mode WHEN 'CHARGE' THEN p.amount ELSE -p.amount END), 0) FROM pay_record p JOIN dispatch_order o ON o.id = p.order_id WHERE p.status = 'CONFIRMED' AND o.is_deleted = 0",
    );
    push_in_filter(&mut qb, "o.org_id", org_ids);
    let net = qb.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(net)
}
