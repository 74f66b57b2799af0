use super::intake::intake_unit;
use crate::audit_log;
use crate::db::repository::{conflict, student};
use crate::error::{DispatchError, DispatchResult, Resource};
use crate::orders::auth;
use crate::statistics::StatisticsLedger;
use crate::tx::TxCoordinator;
use crate::utils::time::SharedClock;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_required_text,
    validate_telephone,
};
use futures::FutureExt;
use shared::models::{
    ConflictStatus, Operator, Student, StudentConflict, StudentCreate, StudentIntake, StudentStatus,
};
use shared::util::DAY_MILLIS;
use sqlx::{SqliteConnection, SqlitePool};

/// Student intake and conflict resolution
#[derive(Clone)]
pub struct ConflictResolver {
    coordinator: TxCoordinator,
    ledger: StatisticsLedger,
    clock: SharedClock,
    window_ms: i64,
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("window_days", &(self.window_ms / DAY_MILLIS))
            .finish()
    }
}

impl ConflictResolver {
    pub fn new(
        coordinator: TxCoordinator,
        ledger: StatisticsLedger,
        clock: SharedClock,
        challenge_window_days: i64,
    ) -> Self {
        Self {
            coordinator,
            ledger,
            clock,
            window_ms: challenge_window_days * DAY_MILLIS,
        }
    }

    fn pool(&self) -> &SqlitePool {
        self.coordinator.pool()
    }

    /// Register a lead entered by `operator` and apply the intake rules
    pub async fn create_student(
        &self,
        data: StudentCreate,
        operator: &Operator,
    ) -> DispatchResult<StudentIntake> {
        let mut data = data;
        data.telephone = data.telephone.trim().to_string();
        validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
        validate_telephone(&data.telephone)?;
        validate_optional_text(&data.source, "source", MAX_SHORT_TEXT_LEN)?;

        let ledger = self.ledger.clone();
        let operator = *operator;
        let window_ms = self.window_ms;
        let now = self.clock.now_millis();
        let intake = self
            .coordinator
            .run(move |conn| intake_unit(conn, ledger, data, operator, window_ms, now).boxed())
            .await?;

        tracing::info!(
            student_id = intake.student.id,
            status = ?intake.student.status,
            conflict_id = intake.conflict.as_ref().map(|c| c.id),
            "Student registered"
        );
        audit_log!(operator.user_id, "student.create", intake.student.id);
        Ok(intake)
    }

    /// Open or refresh the telephone's conflict; `total` is recounted from
    /// the student table. The telephone needs a failed candidate, otherwise
    /// nothing could ever resolve the conflict.
    pub async fn record_attempt(&self, telephone: &str, author_id: i64) -> DispatchResult<StudentConflict> {
        let telephone = telephone.trim();
        validate_telephone(telephone)?;
        let telephone = telephone.to_string();
        let now = self.clock.now_millis();
        let recorded = self
            .coordinator
            .run(move |conn| record_unit(conn, telephone, author_id, now).boxed())
            .await?;
        tracing::info!(conflict_id = recorded.id, total = recorded.total, "Conflict attempt recorded");
        Ok(recorded)
    }

    /// Close a conflict in favour of `chosen_id`.
    ///
    /// The chosen student must currently be `ConflictFailed`; it becomes
    /// `ConflictSucceeded` and every other holder of the telephone becomes
    /// `ConflictFailed`. `Exceeded` records are left alone. Returns the
    /// telephone group after resolution.
    pub async fn resolve(
        &self,
        conflict_id: i64,
        chosen_id: i64,
        operator: &Operator,
    ) -> DispatchResult<Vec<Student>> {
        {
            let mut conn = self.pool().acquire().await?;
            auth::ensure_root(&mut conn, operator).await?;
            let current = require_conflict(&mut conn, conflict_id).await?;
            if current.status != ConflictStatus::Unprocessed {
                return Err(already_processed(conflict_id));
            }
        }

        let now = self.clock.now_millis();
        let group = self
            .coordinator
            .run(move |conn| resolve_unit(conn, conflict_id, chosen_id, now).boxed())
            .await?;

        tracing::info!(conflict_id, chosen_id, group = group.len(), "Conflict resolved");
        audit_log!(operator.user_id, "conflict.resolve", conflict_id, format!("winner={chosen_id}"));
        Ok(group)
    }

    pub async fn get_conflict(&self, conflict_id: i64) -> DispatchResult<StudentConflict> {
        let mut conn = self.pool().acquire().await?;
        require_conflict(&mut conn, conflict_id).await
    }

    pub async fn list_conflicts(&self, status: Option<ConflictStatus>) -> DispatchResult<Vec<StudentConflict>> {
        let mut conn = self.pool().acquire().await?;
        Ok(conflict::list(&mut conn, status).await?)
    }

    /// Every record sharing the telephone, oldest first
    pub async fn students_by_telephone(&self, telephone: &str) -> DispatchResult<Vec<Student>> {
        let mut conn = self.pool().acquire().await?;
        Ok(student::find_by_telephone(&mut conn, telephone).await?)
    }
}

async fn record_unit(
    conn: &mut SqliteConnection,
    telephone: String,
    author_id: i64,
    now: i64,
) -> DispatchResult<StudentConflict> {
    let recorded = conflict::upsert_open(conn, &telephone, author_id, now).await?;
    let candidates = student::count_in_status(conn, &telephone, StudentStatus::ConflictFailed).await?;
    if candidates == 0 {
        tracing::warn!(telephone = %telephone, total = recorded.total, "Conflict attempt without a failed candidate");
        return Err(DispatchError::InvalidEntity(format!(
            "Telephone {telephone} has no failed candidate to resolve"
        )));
    }
    Ok(recorded)
}

async fn resolve_unit(
    conn: &mut SqliteConnection,
    conflict_id: i64,
    chosen_id: i64,
    now: i64,
) -> DispatchResult<Vec<Student>> {
    if !conflict::mark_processed(conn, conflict_id, now).await? {
        return Err(already_processed(conflict_id));
    }
    let current = require_conflict(conn, conflict_id).await?;
    let group = student::find_by_telephone(conn, &current.telephone).await?;

    let Some(chosen) = group.iter().find(|s| s.id == chosen_id) else {
        return Err(no_valid_selection(conflict_id, chosen_id, "not in the telephone group"));
    };
    if chosen.status != StudentStatus::ConflictFailed {
        return Err(no_valid_selection(conflict_id, chosen_id, "not a failed candidate"));
    }

    for other in group.iter().filter(|s| s.id != chosen_id && s.status.is_holder()) {
        student::update_status(conn, other.id, other.status, StudentStatus::ConflictFailed, now).await?;
    }
    student::update_status(
        conn,
        chosen_id,
        StudentStatus::ConflictFailed,
        StudentStatus::ConflictSucceeded,
        now,
    )
    .await?;

    Ok(student::find_by_telephone(conn, &current.telephone).await?)
}

async fn require_conflict(conn: &mut SqliteConnection, conflict_id: i64) -> DispatchResult<StudentConflict> {
    conflict::find_by_id(conn, conflict_id)
        .await?
        .ok_or(DispatchError::NotFound(Resource::Conflict, conflict_id))
}

fn already_processed(conflict_id: i64) -> DispatchError {
    tracing::warn!(conflict_id, "Conflict already processed");
    DispatchError::AlreadyProcessed(format!("Conflict {conflict_id} is already processed"))
}

fn no_valid_selection(conflict_id: i64, chosen_id: i64, reason: &str) -> DispatchError {
    tracing::warn!(conflict_id, chosen_id, reason, "Rejected conflict selection");
    DispatchError::NoValidSelection(format!("Student {chosen_id} is {reason}"))
}
