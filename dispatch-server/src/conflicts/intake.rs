use crate::db::repository::{conflict, student};
use crate::db::repository::student::NewStudent;
use crate::error::{DispatchError, DispatchResult, Resource};
use crate::statistics::StatisticsLedger;
use shared::models::{Dimension, KEY_STUDENT, Operator, StudentCreate, StudentIntake, StudentStatus};
use sqlx::SqliteConnection;

/// Days during which an earlier record keeps its telephone
pub const DEFAULT_CHALLENGE_WINDOW_DAYS: i64 = 60;

/// Status of a new intake given the most recent earlier record's creation
/// time. Inside the window the earlier record wins; once the window has
/// fully elapsed the newcomer takes the telephone over.
pub fn intake_status(prior_created_at: Option<i64>, now: i64, window_ms: i64) -> StudentStatus {
    match prior_created_at {
        None => StudentStatus::Fresh,
        Some(created_at) if now - created_at < window_ms => StudentStatus::ConflictFailed,
        Some(_) => StudentStatus::ConflictSucceeded,
    }
}

/// Intake unit of work. The insert runs first so the transaction takes the
/// write lock before it reads the telephone group.
pub(super) async fn intake_unit(
    conn: &mut SqliteConnection,
    ledger: StatisticsLedger,
    data: StudentCreate,
    operator: Operator,
    window_ms: i64,
    now: i64,
) -> DispatchResult<StudentIntake> {
    let created = student::create(
        conn,
        NewStudent {
            name: data.name.trim(),
            telephone: &data.telephone,
            author_id: operator.user_id,
            org_id: operator.org_id,
            source: data.source.trim(),
            status: StudentStatus::Fresh,
        },
        now,
    )
    .await?;

    let prior = student::find_latest_other(conn, &data.telephone, created.id).await?;
    let status = intake_status(prior.as_ref().map(|p| p.created_at), now, window_ms);

    let conflict_row = match status {
        StudentStatus::ConflictFailed => {
            student::update_status(conn, created.id, StudentStatus::Fresh, status, now).await?;
            Some(conflict::upsert_open(conn, &data.telephone, operator.user_id, now).await?)
        }
        StudentStatus::ConflictSucceeded => {
            student::update_status(conn, created.id, StudentStatus::Fresh, status, now).await?;
            let demoted =
                student::demote_holders(conn, &data.telephone, created.id, StudentStatus::Exceeded, now)
                    .await?;
            tracing::info!(telephone = %data.telephone, demoted, "Challenge window elapsed, telephone taken over");

            // Only failed candidates can win a resolution. Without one the
            // takeover is recorded as already settled.
            let candidates =
                student::count_in_status(conn, &data.telephone, StudentStatus::ConflictFailed).await?;
            let row = if candidates > 0 {
                conflict::upsert_open(conn, &data.telephone, operator.user_id, now).await?
            } else {
                conflict::record_closed(conn, &data.telephone, operator.user_id, now).await?
            };
            Some(row)
        }
        _ => None,
    };

    let dimension = Dimension::new(KEY_STUDENT)
        .author(operator.user_id)
        .org(operator.org_id)
        .source(data.source.trim());
    ledger.add_value(conn, &dimension, 1.0, true).await?;

    let student = student::find_by_id(conn, created.id)
        .await?
        .ok_or_else(|| DispatchError::NotFound(Resource::Student, created.id))?;
    Ok(StudentIntake {
        student,
        conflict: conflict_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::DAY_MILLIS;

    const WINDOW: i64 = DEFAULT_CHALLENGE_WINDOW_DAYS * DAY_MILLIS;

    #[test]
    fn status_by_age_of_prior_record() {
        let now = 100 * DAY_MILLIS;
        assert_eq!(intake_status(None, now, WINDOW), StudentStatus::Fresh);
        assert_eq!(intake_status(Some(now - DAY_MILLIS), now, WINDOW), StudentStatus::ConflictFailed);
        assert_eq!(intake_status(Some(now - WINDOW + 1), now, WINDOW), StudentStatus::ConflictFailed);
        // Exactly at the boundary the window has elapsed
        assert_eq!(intake_status(Some(now - WINDOW), now, WINDOW), StudentStatus::ConflictSucceeded);
        assert_eq!(intake_status(Some(now - 64 * DAY_MILLIS), now, WINDOW), StudentStatus::ConflictSucceeded);
    }
}
