//! Student Conflict Repository

use super::RepoResult;
use shared::models::{ConflictStatus, StudentConflict};
use sqlx::SqliteConnection;

const SELECT_CONFLICT: &str =
    "SELECT id, telephone, status, total, author_id, created_at, updated_at FROM student_conflict";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<StudentConflict>> {
    let conflict = sqlx::query_as::<_, StudentConflict>(&format!("{SELECT_CONFLICT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(conflict)
}

/// Create the telephone's open conflict or refresh it with the latest
/// reporter. `total` is always recounted from the student table.
///
/// The partial unique index on open conflicts makes this a single upsert.
pub async fn upsert_open(
    conn: &mut SqliteConnection,
    telephone: &str,
    author_id: i64,
    now: i64,
) -> RepoResult<StudentConflict> {
    let conflict = sqlx::query_as::<_, StudentConflict>(
        "INSERT INTO student_conflict (telephone, status, total, author_id, created_at, updated_at) \
         VALUES (?1, 'UNPROCESSED', (SELECT COUNT(*) FROM student WHERE telephone = ?1), ?2, ?3, ?3) \
         ON CONFLICT(telephone) WHERE status = 'UNPROCESSED' DO UPDATE SET \
         total = excluded.total, author_id = excluded.author_id, updated_at = excluded.updated_at \
         RETURNING id, telephone, status, total, author_id, created_at, updated_at",
    )
    .bind(telephone)
    .bind(author_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(conflict)
}

/// Record a conflict that needs no decision. The row is written already
/// PROCESSED so it never shows up as open work.
pub async fn record_closed(
    conn: &mut SqliteConnection,
    telephone: &str,
    author_id: i64,
    now: i64,
) -> RepoResult<StudentConflict> {
    let conflict = sqlx::query_as::<_, StudentConflict>(
        "INSERT INTO student_conflict (telephone, status, total, author_id, created_at, updated_at) \
         VALUES (?1, 'PROCESSED', (SELECT COUNT(*) FROM student WHERE telephone = ?1), ?2, ?3, ?3) \
         RETURNING id, telephone, status, total, author_id, created_at, updated_at",
    )
    .bind(telephone)
    .bind(author_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(conflict)
}

/// UNPROCESSED → PROCESSED (compare-and-set); false when already processed
pub async fn mark_processed(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE student_conflict SET status = 'PROCESSED', updated_at = ?1 WHERE id = ?2 AND status = 'UNPROCESSED'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected() == 1)
}

pub async fn list(
    conn: &mut SqliteConnection,
    status: Option<ConflictStatus>,
) -> RepoResult<Vec<StudentConflict>> {
    let conflicts = match status {
        Some(status) => {
            sqlx::query_as::<_, StudentConflict>(&format!(
                "{SELECT_CONFLICT} WHERE status = ? ORDER BY updated_at DESC, id DESC"
            ))
            .bind(status)
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, StudentConflict>(&format!(
                "{SELECT_CONFLICT} ORDER BY updated_at DESC, id DESC"
            ))
            .fetch_all(conn)
            .await?
        }
    };
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDb;

    #[tokio::test]
    async fn one_open_conflict_per_telephone() {
        let db = TestDb::new().await;
        let mut conn = db.conn().await;
        for id in [100, 101] {
            sqlx::query(
                "INSERT INTO student (id, name, telephone, author_id, org_id, source, status, created_at, updated_at) VALUES (?1, 's', '13800000000', 1, 1, '', 'FRESH', 0, 0)",
            )
            .bind(id)
            .execute(&mut *conn)
            .await
            .unwrap();
        }

        let first = upsert_open(&mut conn, "13800000000", 1, 10).await.unwrap();
        assert_eq!(first.total, 2);

        sqlx::query(
            "INSERT INTO student (id, name, telephone, author_id, org_id, source, status, created_at, updated_at) VALUES (102, 's', '13800000000', 2, 1, '', 'FRESH', 0, 0)",
        )
        .execute(&mut *conn)
        .await
        .unwrap();
        let second = upsert_open(&mut conn, "13800000000", 2, 20).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.total, 3);
        assert_eq!(second.author_id, 2);
        assert_eq!(second.created_at, 10);

        // Once processed a new attempt opens a fresh record
        assert!(mark_processed(&mut conn, first.id, 30).await.unwrap());
        assert!(!mark_processed(&mut conn, first.id, 31).await.unwrap());
        let third = upsert_open(&mut conn, "13800000000", 3, 40).await.unwrap();
        assert_ne!(third.id, first.id);

        let open = list(&mut conn, Some(ConflictStatus::Unprocessed)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(list(&mut conn, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn closed_record_leaves_the_open_slot_free() {
        let db = TestDb::new().await;
        let mut conn = db.conn().await;
        sqlx::query(
            "INSERT INTO student (id, name, telephone, author_id, org_id, source, status, created_at, updated_at) VALUES (100, 's', '13800000000', 1, 1, '', 'EXCEEDED', 0, 0)",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let closed = record_closed(&mut conn, "13800000000", 1, 10).await.unwrap();
        assert_eq!(closed.status, ConflictStatus::Processed);
        assert_eq!(closed.total, 1);
        assert!(list(&mut conn, Some(ConflictStatus::Unprocessed)).await.unwrap().is_empty());

        let open = upsert_open(&mut conn, "13800000000", 2, 20).await.unwrap();
        assert_ne!(open.id, closed.id);
        assert_eq!(open.status, ConflictStatus::Unprocessed);
    }
}
