//! Dispatch Order Repository

use super::{RepoError, RepoResult, paging, push_in_filter};
use shared::models::{Order, OrderCreate, OrderQuery, OrderStatus, OrderView, Page};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT_ORDER: &str = "SELECT id, student_id, org_id, subjects, publisher_id, status, is_deleted, created_at, updated_at FROM dispatch_order";

const SELECT_VIEW: &str = "SELECT o.id, o.student_id, s.name AS student_name, s.telephone AS student_telephone, o.org_id, g.name AS org_name, o.subjects, o.publisher_id, COALESCE(u.name, '') AS publisher_name, o.status, o.created_at, o.updated_at FROM dispatch_order o JOIN student s ON s.id = o.student_id JOIN organization g ON g.id = o.org_id LEFT JOIN app_user u ON u.id = o.publisher_id WHERE o.is_deleted = 0";

/// Live (not soft-deleted) order by id
pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "{SELECT_ORDER} WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn find_view(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<OrderView>> {
    let view = sqlx::query_as::<_, OrderView>(&format!("{SELECT_VIEW} AND o.id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(view)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: &OrderCreate,
    publisher_id: i64,
    now: i64,
) -> RepoResult<Order> {
    let subjects = serde_json::to_string(&data.subjects)
        .map_err(|e| RepoError::Validation(format!("Invalid subjects: {e}")))?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO dispatch_order (student_id, org_id, subjects, publisher_id, status, is_deleted, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 'CREATED', 0, ?5, ?5) RETURNING id",
    )
    .bind(data.student_id)
    .bind(data.org_id)
    .bind(subjects)
    .bind(publisher_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Compare-and-set status transition; returns false when the order was no
/// longer in `from` (or is deleted)
pub async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dispatch_order SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4 AND is_deleted = 0",
    )
    .bind(to)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Soft delete unless the order is signed or deposited
pub async fn soft_delete(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dispatch_order SET is_deleted = 1, updated_at = ?1 WHERE id = ?2 AND is_deleted = 0 AND status NOT IN ('SIGNED', 'DEPOSITED')",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Search orders; `query.org_ids` must already be expanded to descendants
pub async fn search(
    conn: &mut SqliteConnection,
    query: &OrderQuery,
) -> RepoResult<Page<OrderView>> {
    let (page, size, offset) = paging(query.page, query.size);

    let mut count_qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM dispatch_order o WHERE o.is_deleted = 0",
    );
    push_order_filters(&mut count_qb, query);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_VIEW);
    push_order_filters(&mut qb, query);
    qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
        .push_bind(i64::from(size))
        .push(" OFFSET ")
        .push_bind(offset);
    let items = qb.build_query_as::<OrderView>().fetch_all(conn).await?;

    Ok(Page {
        items,
        total,
        page,
        size,
    })
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &OrderQuery) {
    push_in_filter(qb, "o.org_id", &query.org_ids);
    if let Some(status) = query.status {
        qb.push(" AND o.status = ").push_bind(status);
    }
    if let Some(student_id) = query.student_id {
        qb.push(" AND o.student_id = ").push_bind(student_id);
    }
    if let Some(publisher_id) = query.publisher_id {
        qb.push(" AND o.publisher_id = ").push_bind(publisher_id);
    }
}

/// (total live orders, signed-or-deposited orders) for `org_ids` (all when empty)
pub async fn success_counts(conn: &mut SqliteConnection, org_ids: &[i64]) -> RepoResult<(i64, i64)> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status IN ('SIGNED', 'DEPOSITED') THEN 1 ELSE 0 END), 0) FROM dispatch_order WHERE is_deleted = 0",
    );
    push_in_filter(&mut qb, "org_id", org_ids);
    let counts = qb.build_query_as::<(i64, i64)>().fetch_one(conn).await?;
    Ok(counts)
}
