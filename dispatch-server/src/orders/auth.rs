//! Ownership checks
//!
//! An operator owns an institution when it *is* that institution or its
//! direct parent. Root operators (institution without a parent) may also
//! confirm payments and leave internal remarks on any order.

use crate::db::repository::{RepoResult, organization};
use crate::error::{DispatchError, DispatchResult};
use shared::models::Operator;
use sqlx::SqliteConnection;

pub async fn owns_org(conn: &mut SqliteConnection, operator: &Operator, org_id: i64) -> RepoResult<bool> {
    if operator.org_id == org_id {
        return Ok(true);
    }
    let org = organization::find_by_id(conn, org_id).await?;
    Ok(org.and_then(|o| o.parent_id) == Some(operator.org_id))
}

pub async fn is_root_operator(conn: &mut SqliteConnection, operator: &Operator) -> RepoResult<bool> {
    let org = organization::find_by_id(conn, operator.org_id).await?;
    Ok(org.is_some_and(|o| o.is_root()))
}

/// `Unauthorized` unless the operator owns `org_id`
pub async fn ensure_owner(
    conn: &mut SqliteConnection,
    operator: &Operator,
    org_id: i64,
) -> DispatchResult<()> {
    if owns_org(conn, operator, org_id).await? {
        Ok(())
    } else {
        tracing::warn!(
            user_id = operator.user_id,
            operator_org = operator.org_id,
            org_id,
            "Operator does not own institution"
        );
        Err(DispatchError::Unauthorized(format!(
            "Institution {} does not own institution {org_id}",
            operator.org_id
        )))
    }
}

/// `Unauthorized` unless the operator belongs to a root institution
pub async fn ensure_root(conn: &mut SqliteConnection, operator: &Operator) -> DispatchResult<()> {
    if is_root_operator(conn, operator).await? {
        Ok(())
    } else {
        Err(DispatchError::Unauthorized(format!(
            "Institution {} is not a root institution",
            operator.org_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, TestDb};

    #[tokio::test]
    async fn ownership_is_self_or_direct_parent() {
        let db = TestDb::new().await;
        let fx = db.seed().await;
        let mut conn = db.conn().await;

        let school = fx.school();
        assert!(owns_org(&mut conn, &school, Fixture::SCHOOL_ORG).await.unwrap());
        assert!(owns_org(&mut conn, &school, Fixture::BRANCH_ORG).await.unwrap());
        assert!(!owns_org(&mut conn, &school, Fixture::RIVAL_ORG).await.unwrap());
        assert!(!owns_org(&mut conn, &school, Fixture::ROOT_ORG).await.unwrap());

        // Root owns its children but not grandchildren
        let root = fx.root();
        assert!(owns_org(&mut conn, &root, Fixture::SCHOOL_ORG).await.unwrap());
        assert!(!owns_org(&mut conn, &root, Fixture::BRANCH_ORG).await.unwrap());

        assert!(matches!(
            ensure_owner(&mut conn, &fx.rival(), Fixture::SCHOOL_ORG).await,
            Err(DispatchError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn root_operator_detection() {
        let db = TestDb::new().await;
        let fx = db.seed().await;
        let mut conn = db.conn().await;

        assert!(is_root_operator(&mut conn, &fx.root()).await.unwrap());
        assert!(!is_root_operator(&mut conn, &fx.school()).await.unwrap());
        assert!(ensure_root(&mut conn, &fx.rival()).await.is_err());
    }
}
