//! Order Notify Repository

use super::{RepoError, RepoResult, paging, push_in_filter};
use shared::models::{NotifyKind, NotifyQuery, OrderNotify, Page};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT_NOTIFY: &str = "SELECT id, order_id, org_id, kind, content, author_id, status, created_at, updated_at FROM order_notify";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<OrderNotify>> {
    let notify = sqlx::query_as::<_, OrderNotify>(&format!("{SELECT_NOTIFY} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(notify)
}

pub async fn create(
    conn: &mut SqliteConnection,
    order_id: i64,
    org_id: i64,
    kind: NotifyKind,
    content: &str,
    author_id: i64,
    now: i64,
) -> RepoResult<OrderNotify> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO order_notify (order_id, org_id, kind, content, author_id, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 'UNREAD', ?6, ?6) RETURNING id",
    )
    .bind(order_id)
    .bind(org_id)
    .bind(kind)
    .bind(content)
    .bind(author_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create notify".into()))
}

/// Flip to READ; returns false when it was already read
pub async fn mark_read(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE order_notify SET status = 'READ', updated_at = ?1 WHERE id = ?2 AND status = 'UNREAD'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

pub async fn search(conn: &mut SqliteConnection, query: &NotifyQuery) -> RepoResult<Page<OrderNotify>> {
    let (page, size, offset) = paging(query.page, query.size);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM order_notify WHERE 1 = 1");
    push_notify_filters(&mut count_qb, query);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("{SELECT_NOTIFY} WHERE 1 = 1"));
    push_notify_filters(&mut qb, query);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::from(size))
        .push(" OFFSET ")
        .push_bind(offset);
    let items = qb.build_query_as::<OrderNotify>().fetch_all(conn).await?;

    Ok(Page {
        items,
        total,
        page,
        size,
    })
}

fn push_notify_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &NotifyQuery) {
    push_in_filter(qb, "org_id", &query.org_ids);
    if let Some(order_id) = query.order_id {
        qb.push(" AND order_id = ").push_bind(order_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

pub async fn unread_count(conn: &mut SqliteConnection, org_ids: &[i64]) -> RepoResult<i64> {
    let mut qb =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM order_notify WHERE status = 'UNREAD'");
    push_in_filter(&mut qb, "org_id", org_ids);
    let count = qb.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}
