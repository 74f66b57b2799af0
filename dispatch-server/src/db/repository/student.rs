//! Student Repository

use super::{RepoError, RepoResult, push_in_filter};
use shared::models::{Student, StudentStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT_STUDENT: &str = "SELECT id, name, telephone, author_id, org_id, source, status, created_at, updated_at FROM student";

pub struct NewStudent<'a> {
    pub name: &'a str,
    pub telephone: &'a str,
    pub author_id: i64,
    pub org_id: i64,
    pub source: &'a str,
    pub status: StudentStatus,
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(&format!("{SELECT_STUDENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(student)
}

pub async fn create(
    conn: &mut SqliteConnection,
    data: NewStudent<'_>,
    now: i64,
) -> RepoResult<Student> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO student (name, telephone, author_id, org_id, source, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING id",
    )
    .bind(data.name)
    .bind(data.telephone)
    .bind(data.author_id)
    .bind(data.org_id)
    .bind(data.source)
    .bind(data.status)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create student".into()))
}

/// Every record sharing the telephone, oldest first
pub async fn find_by_telephone(
    conn: &mut SqliteConnection,
    telephone: &str,
) -> RepoResult<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(&format!(
        "{SELECT_STUDENT} WHERE telephone = ? ORDER BY created_at, id"
    ))
    .bind(telephone)
    .fetch_all(conn)
    .await?;
    Ok(students)
}

/// Most recent record for the telephone other than `exclude_id`
pub async fn find_latest_other(
    conn: &mut SqliteConnection,
    telephone: &str,
    exclude_id: i64,
) -> RepoResult<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(&format!(
        "{SELECT_STUDENT} WHERE telephone = ? AND id <> ? ORDER BY created_at DESC, id DESC LIMIT 1"
    ))
    .bind(telephone)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await?;
    Ok(student)
}

/// Compare-and-set status update; returns false when the row was not in `from`
pub async fn update_status(
    conn: &mut SqliteConnection,
    id: i64,
    from: StudentStatus,
    to: StudentStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE student SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4")
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// Demote every current holder (fresh / conflict-succeeded) of the telephone
/// except `keep_id` to `to`; returns the number of rows changed
pub async fn demote_holders(
    conn: &mut SqliteConnection,
    telephone: &str,
    keep_id: i64,
    to: StudentStatus,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE student SET status = ?1, updated_at = ?2 WHERE telephone = ?3 AND id <> ?4 AND status IN ('FRESH', 'CONFLICT_SUCCEEDED')",
    )
    .bind(to)
    .bind(now)
    .bind(telephone)
    .bind(keep_id)
    .execute(conn)
    .await?;
    Ok(rows.rows_affected())
}

/// Records of the telephone currently in `status`
pub async fn count_in_status(
    conn: &mut SqliteConnection,
    telephone: &str,
    status: StudentStatus,
) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student WHERE telephone = ? AND status = ?")
        .bind(telephone)
        .bind(status)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Students registered by institutions in `org_ids` (all when empty)
pub async fn count(conn: &mut SqliteConnection, org_ids: &[i64]) -> RepoResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM student WHERE 1 = 1");
    push_in_filter(&mut qb, "org_id", org_ids);
    let count = qb.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}
