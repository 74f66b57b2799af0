//! Organization Repository

use super::{RepoError, RepoResult, push_in_filter};
use shared::models::{OrgStatus, Organization};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT_ORG: &str =
    "SELECT id, name, parent_id, status, created_at, updated_at FROM organization";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Organization>> {
    let org = sqlx::query_as::<_, Organization>(&format!("{SELECT_ORG} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(org)
}

pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    parent_id: Option<i64>,
    status: OrgStatus,
    now: i64,
) -> RepoResult<Organization> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO organization (name, parent_id, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) RETURNING id",
    )
    .bind(name)
    .bind(parent_id)
    .bind(status)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    find_by_id(conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create organization".into()))
}

/// Expand `roots` to themselves plus every descendant institution
pub async fn expand_descendants(conn: &mut SqliteConnection, roots: &[i64]) -> RepoResult<Vec<i64>> {
    if roots.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb = QueryBuilder::<Sqlite>::new(
        "WITH RECURSIVE tree(id) AS (SELECT id FROM organization WHERE 1 = 1",
    );
    push_in_filter(&mut qb, "id", roots);
    qb.push(
        " UNION SELECT o.id FROM organization o JOIN tree t ON o.parent_id = t.id) SELECT id FROM tree ORDER BY id",
    );
    let ids = qb.build_query_scalar::<i64>().fetch_all(conn).await?;
    Ok(ids)
}

/// Certified institutions, optionally restricted to `org_ids`
pub async fn count_certified(conn: &mut SqliteConnection, org_ids: &[i64]) -> RepoResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM organization WHERE status = 'CERTIFIED'",
    );
    push_in_filter(&mut qb, "id", org_ids);
    let count = qb.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}
