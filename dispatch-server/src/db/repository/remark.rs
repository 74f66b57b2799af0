//! Remark Repository (append-only)

use super::{RepoError, RepoResult};
use shared::models::{RemarkRecord, RemarkVisibility};
use sqlx::SqliteConnection;

const SELECT_REMARK: &str = "SELECT id, order_id, author_id, visibility, content, created_at, updated_at FROM remark_record";

pub async fn create(
    conn: &mut SqliteConnection,
    order_id: i64,
    author_id: i64,
    visibility: RemarkVisibility,
    content: &str,
    now: i64,
) -> RepoResult<RemarkRecord> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO remark_record (order_id, author_id, visibility, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING id",
    )
    .bind(order_id)
    .bind(author_id)
    .bind(visibility)
    .bind(content)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query_as::<_, RemarkRecord>(&format!("{SELECT_REMARK} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create remark".into()))
}

/// Remarks of an order, oldest first; internal remarks only when asked for
pub async fn list_by_order(
    conn: &mut SqliteConnection,
    order_id: i64,
    include_internal: bool,
) -> RepoResult<Vec<RemarkRecord>> {
    let sql = if include_internal {
        format!("{SELECT_REMARK} WHERE order_id = ? ORDER BY created_at, id")
    } else {
        format!(
            "{SELECT_REMARK} WHERE order_id = ? AND visibility = 'EXTERNAL' ORDER BY created_at, id"
        )
    };
    let remarks = sqlx::query_as::<_, RemarkRecord>(&sql)
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(remarks)
}
