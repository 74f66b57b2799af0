//! OrderManager - 派单操作入口
//!
//! # Mutation flow
//!
//! ```text
//! operation(args, operator)
//!     ├─ 1. Validate input              (Validation, nothing persisted)
//!     ├─ 2. Load order + ownership      (NotFound / Unauthorized)
//!     ├─ 3. Check transition table      (InvalidState / NoOp)
//!     ├─ 4. TxCoordinator unit of work
//!     │     ├─ compare-and-set transition
//!     │     ├─ pay record / ledger row
//!     │     └─ notify row
//!     ├─ 5. Commit
//!     └─ 6. Publish notifies on the hub
//! ```

use super::auth;
use crate::audit_log;
use crate::db::repository::{self, notify, order, organization, payment, remark, student};
use crate::error::{DispatchError, DispatchResult, Resource};
use crate::notify::NotifyHub;
use crate::statistics::StatisticsLedger;
use crate::tx::TxCoordinator;
use crate::utils::time::SharedClock;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_amount, validate_required_text,
};
use futures::FutureExt;
use serde::Serialize;
use shared::models::{
    Dimension, KEY_ORDER, NotifyKind, NotifyQuery, Operator, Order, OrderCreate, OrderNotify,
    OrderQuery, OrderStatus, OrderView, Page, PayDecision, PayMode, PayRecord, PayStatus,
    PaymentRequest, RemarkRecord, RemarkVisibility, TransitionOutcome,
};
use sqlx::{SqliteConnection, SqlitePool};

/// Result of a successful sign-up
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub order: Order,
    /// The pending charge opened by the sign-up
    pub pay_record: PayRecord,
}

/// Outcome of a close transition (revoke / invalidate) inside the unit of work
enum CloseOutcome {
    Closed(OrderNotify),
    /// Lost the compare-and-set; the order is now in this status
    Unchanged(OrderStatus),
}

#[derive(Clone)]
pub struct OrderManager {
    coordinator: TxCoordinator,
    ledger: StatisticsLedger,
    hub: NotifyHub,
    clock: SharedClock,
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager")
            .field("timeout", &self.coordinator.timeout())
            .field("hub", &self.hub)
            .finish()
    }
}

impl OrderManager {
    pub fn new(
        coordinator: TxCoordinator,
        ledger: StatisticsLedger,
        hub: NotifyHub,
        clock: SharedClock,
    ) -> Self {
        Self {
            coordinator,
            ledger,
            hub,
            clock,
        }
    }

    fn pool(&self) -> &SqlitePool {
        self.coordinator.pool()
    }

    // ========== Mutations ==========

    /// Insert a CREATED order published by `operator`
    pub async fn create_order(&self, data: OrderCreate, operator: &Operator) -> DispatchResult<Order> {
        for subject in &data.subjects {
            validate_required_text(subject, "subject", MAX_SHORT_TEXT_LEN)?;
        }

        let mut conn = self.pool().acquire().await?;
        if student::find_by_id(&mut conn, data.student_id).await?.is_none() {
            tracing::warn!(student_id = data.student_id, "Create order: student not found");
            return Err(DispatchError::InvalidEntity(format!(
                "Student {} not found",
                data.student_id
            )));
        }
        match organization::find_by_id(&mut conn, data.org_id).await? {
            Some(org) if org.is_certified() => {}
            Some(org) => {
                tracing::warn!(org_id = org.id, status = ?org.status, "Create order: institution not certified");
                return Err(DispatchError::InvalidEntity(format!(
                    "Institution {} is not certified",
                    org.id
                )));
            }
            None => {
                tracing::warn!(org_id = data.org_id, "Create order: institution not found");
                return Err(DispatchError::InvalidEntity(format!(
                    "Institution {} not found",
                    data.org_id
                )));
            }
        }

        let created = order::create(&mut conn, &data, operator.user_id, self.clock.now_millis()).await?;
        tracing::info!(
            order_id = created.id,
            student_id = created.student_id,
            org_id = created.org_id,
            publisher_id = created.publisher_id,
            "Order created"
        );
        audit_log!(operator.user_id, "order.create", created.id);
        Ok(created)
    }

    /// CREATED → SIGNED with a pending charge and a signup notify
    pub async fn sign_up_order(
        &self,
        order_id: i64,
        request: PaymentRequest,
        operator: &Operator,
    ) -> DispatchResult<SignUpOutcome> {
        validate_payment(&request)?;
        let current = self.load_owned_order(order_id, operator).await?;
        ensure_transition(&current, OrderStatus::Signed)?;

        let now = self.clock.now_millis();
        let author_id = operator.user_id;
        let (outcome, signup) = self
            .coordinator
            .run(move |conn| sign_up_unit(conn, current, request, author_id, now).boxed())
            .await?;

        self.hub.publish(signup);
        tracing::info!(
            order_id,
            pay_id = outcome.pay_record.id,
            amount = outcome.pay_record.amount,
            "Order signed up"
        );
        audit_log!(operator.user_id, "order.sign_up", order_id);
        Ok(outcome)
    }

    /// CREATED → REVOKED. Any other status is an explicit `NoOp`.
    pub async fn revoke_order(&self, order_id: i64, operator: &Operator) -> DispatchResult<TransitionOutcome> {
        let current = self.load_owned_order(order_id, operator).await?;
        if !current.status.can_transition_to(OrderStatus::Revoked) {
            tracing::info!(order_id, status = %current.status, "Revoke is a no-op");
            return Ok(TransitionOutcome::NoOp {
                current: current.status,
            });
        }

        match self
            .close_order(current, OrderStatus::Revoked, NotifyKind::Revoke, operator)
            .await?
        {
            CloseOutcome::Closed(_) => {
                audit_log!(operator.user_id, "order.revoke", order_id);
                Ok(TransitionOutcome::Applied)
            }
            CloseOutcome::Unchanged(status) => {
                tracing::info!(order_id, status = %status, "Revoke lost the race, no-op");
                Ok(TransitionOutcome::NoOp { current: status })
            }
        }
    }

    /// CREATED → INVALID; any other status is `InvalidState`
    pub async fn invalidate_order(&self, order_id: i64, operator: &Operator) -> DispatchResult<()> {
        let current = self.load_owned_order(order_id, operator).await?;
        ensure_transition(&current, OrderStatus::Invalid)?;

        match self
            .close_order(current, OrderStatus::Invalid, NotifyKind::Invalid, operator)
            .await?
        {
            CloseOutcome::Closed(_) => {
                audit_log!(operator.user_id, "order.invalidate", order_id);
                Ok(())
            }
            CloseOutcome::Unchanged(status) => Err(invalid_transition(order_id, status, OrderStatus::Invalid)),
        }
    }

    async fn close_order(
        &self,
        current: Order,
        to: OrderStatus,
        kind: NotifyKind,
        operator: &Operator,
    ) -> DispatchResult<CloseOutcome> {
        let order_id = current.id;
        let now = self.clock.now_millis();
        let author_id = operator.user_id;
        let outcome = self
            .coordinator
            .run(move |conn| close_unit(conn, current, to, kind, author_id, now).boxed())
            .await?;

        if let CloseOutcome::Closed(row) = &outcome {
            self.hub.publish(row.clone());
            tracing::info!(order_id, status = %to, "Order closed");
        }
        Ok(outcome)
    }

    /// Soft delete; signed and deposited orders are kept
    pub async fn delete_order(&self, order_id: i64, operator: &Operator) -> DispatchResult<()> {
        let current = self.load_owned_order(order_id, operator).await?;
        if current.status.is_success() {
            return Err(DispatchError::InvalidState(format!(
                "Order {order_id} is {}, cannot be deleted",
                current.status
            )));
        }

        let mut conn = self.pool().acquire().await?;
        if !order::soft_delete(&mut conn, order_id, self.clock.now_millis()).await? {
            let status = order::find_by_id(&mut conn, order_id)
                .await?
                .map(|o| o.status.to_string())
                .unwrap_or_else(|| "deleted".to_string());
            tracing::warn!(order_id, status = %status, "Delete lost the race");
            return Err(DispatchError::InvalidState(format!(
                "Order {order_id} is {status}, cannot be deleted"
            )));
        }

        tracing::info!(order_id, "Order deleted");
        audit_log!(operator.user_id, "order.delete", order_id);
        Ok(())
    }

    /// Append a pending charge
    pub async fn pay_order(
        &self,
        order_id: i64,
        request: PaymentRequest,
        operator: &Operator,
    ) -> DispatchResult<PayRecord> {
        self.append_payment(order_id, PayMode::Charge, request, operator).await
    }

    /// Append a pending refund
    pub async fn payback_order(
        &self,
        order_id: i64,
        request: PaymentRequest,
        operator: &Operator,
    ) -> DispatchResult<PayRecord> {
        self.append_payment(order_id, PayMode::Refund, request, operator).await
    }

    async fn append_payment(
        &self,
        order_id: i64,
        mode: PayMode,
        request: PaymentRequest,
        operator: &Operator,
    ) -> DispatchResult<PayRecord> {
        validate_payment(&request)?;
        let current = self.load_owned_order(order_id, operator).await?;

        let mut conn = self.pool().acquire().await?;
        let record = payment::create(
            &mut conn,
            current.id,
            mode,
            &request.title,
            request.amount,
            self.clock.now_millis(),
        )
        .await?;

        tracing::info!(order_id, pay_id = record.id, mode = ?mode, amount = record.amount, "Pay record added");
        audit_log!(operator.user_id, "order.payment", order_id, format!("{mode:?} {}", record.amount));
        Ok(record)
    }

    /// Decide a pending pay record. A confirmation feeds the `order` ledger
    /// key with the record's performance in the same transaction.
    pub async fn confirm_payment(
        &self,
        pay_id: i64,
        decision: PayDecision,
        operator: &Operator,
    ) -> DispatchResult<PayRecord> {
        let (record, current) = {
            let mut conn = self.pool().acquire().await?;
            let record = payment::find_by_id(&mut conn, pay_id)
                .await?
                .ok_or_else(|| DispatchError::NotFound(Resource::PayRecord, pay_id))?;
            let current = load_order(&mut conn, record.order_id).await?;

            let allowed = auth::is_root_operator(&mut conn, operator).await?
                || auth::owns_org(&mut conn, operator, current.org_id).await?;
            if !allowed {
                tracing::warn!(pay_id, user_id = operator.user_id, "Confirm payment: not authorized");
                return Err(DispatchError::Unauthorized(format!(
                    "Operator {} cannot decide pay record {pay_id}",
                    operator.user_id
                )));
            }
            if record.status != PayStatus::Pending {
                return Err(already_decided(pay_id, record.status));
            }
            (record, current)
        };

        let ledger = self.ledger.clone();
        let now = self.clock.now_millis();
        let author_id = operator.user_id;
        let (decided, deposit) = self
            .coordinator
            .run(move |conn| {
                confirm_unit(conn, ledger, record, current, decision, author_id, now).boxed()
            })
            .await?;

        if let Some(row) = deposit {
            self.hub.publish(row);
        }
        tracing::info!(
            pay_id,
            order_id = decided.order_id,
            status = ?decided.status,
            "Pay record decided"
        );
        audit_log!(operator.user_id, "payment.decide", pay_id, format!("{:?}", decided.status));
        Ok(decided)
    }

    /// Root operators write internal remarks on any order, owners external ones
    pub async fn add_remark(
        &self,
        order_id: i64,
        content: &str,
        operator: &Operator,
    ) -> DispatchResult<RemarkRecord> {
        validate_required_text(content, "content", MAX_NOTE_LEN)?;

        let mut conn = self.pool().acquire().await?;
        let current = load_order(&mut conn, order_id).await?;
        let visibility = if auth::is_root_operator(&mut conn, operator).await? {
            RemarkVisibility::Internal
        } else {
            auth::ensure_owner(&mut conn, operator, current.org_id).await?;
            RemarkVisibility::External
        };

        let record = remark::create(
            &mut conn,
            order_id,
            operator.user_id,
            visibility,
            content.trim(),
            self.clock.now_millis(),
        )
        .await?;
        tracing::info!(order_id, remark_id = record.id, visibility = ?visibility, "Remark added");
        Ok(record)
    }

    /// Flip a notify to READ (idempotent)
    pub async fn mark_read(&self, notify_id: i64, operator: &Operator) -> DispatchResult<OrderNotify> {
        let mut conn = self.pool().acquire().await?;
        let row = notify::find_by_id(&mut conn, notify_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(Resource::Notify, notify_id))?;
        if !auth::is_root_operator(&mut conn, operator).await? {
            auth::ensure_owner(&mut conn, operator, row.org_id).await?;
        }

        if !notify::mark_read(&mut conn, notify_id, self.clock.now_millis()).await? {
            tracing::debug!(notify_id, "Notify already read");
            return Ok(row);
        }
        notify::find_by_id(&mut conn, notify_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(Resource::Notify, notify_id))
    }

    // ========== Reads ==========

    pub async fn get_order(&self, order_id: i64) -> DispatchResult<OrderView> {
        let mut conn = self.pool().acquire().await?;
        order::find_view(&mut conn, order_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(Resource::Order, order_id))
    }

    /// Institution ids in the query cover their sub-institutions too
    pub async fn search_orders(&self, mut query: OrderQuery) -> DispatchResult<Page<OrderView>> {
        let mut conn = self.pool().acquire().await?;
        if !query.org_ids.is_empty() {
            query.org_ids = organization::expand_descendants(&mut conn, &query.org_ids).await?;
            if query.org_ids.is_empty() {
                let (page, size, _) = repository::paging(query.page, query.size);
                return Ok(Page::empty(page, size));
            }
        }
        Ok(order::search(&mut conn, &query).await?)
    }

    pub async fn list_pay_records(&self, order_id: i64) -> DispatchResult<Vec<PayRecord>> {
        let mut conn = self.pool().acquire().await?;
        load_order(&mut conn, order_id).await?;
        Ok(payment::list_by_order(&mut conn, order_id).await?)
    }

    /// Internal remarks are only visible to root operators
    pub async fn list_remarks(&self, order_id: i64, operator: &Operator) -> DispatchResult<Vec<RemarkRecord>> {
        let mut conn = self.pool().acquire().await?;
        let current = load_order(&mut conn, order_id).await?;
        let include_internal = auth::is_root_operator(&mut conn, operator).await?;
        if !include_internal {
            auth::ensure_owner(&mut conn, operator, current.org_id).await?;
        }
        Ok(remark::list_by_order(&mut conn, order_id, include_internal).await?)
    }

    pub async fn list_notifies(&self, mut query: NotifyQuery) -> DispatchResult<Page<OrderNotify>> {
        let mut conn = self.pool().acquire().await?;
        if !query.org_ids.is_empty() {
            query.org_ids = organization::expand_descendants(&mut conn, &query.org_ids).await?;
            if query.org_ids.is_empty() {
                let (page, size, _) = repository::paging(query.page, query.size);
                return Ok(Page::empty(page, size));
            }
        }
        Ok(notify::search(&mut conn, &query).await?)
    }

    pub async fn unread_count(&self, org_ids: &[i64]) -> DispatchResult<i64> {
        let mut conn = self.pool().acquire().await?;
        Ok(notify::unread_count(&mut conn, org_ids).await?)
    }

    /// Load an order and check that `operator` owns its institution.
    /// The pooled connection is released before any unit of work starts.
    async fn load_owned_order(&self, order_id: i64, operator: &Operator) -> DispatchResult<Order> {
        let mut conn = self.pool().acquire().await?;
        let current = load_order(&mut conn, order_id).await?;
        auth::ensure_owner(&mut conn, operator, current.org_id).await?;
        Ok(current)
    }
}

// ========== Units of work ==========

async fn sign_up_unit(
    conn: &mut SqliteConnection,
    current: Order,
    request: PaymentRequest,
    author_id: i64,
    now: i64,
) -> DispatchResult<(SignUpOutcome, OrderNotify)> {
    if !order::transition(conn, current.id, OrderStatus::Created, OrderStatus::Signed, now).await? {
        let status = load_order(conn, current.id).await?.status;
        return Err(invalid_transition(current.id, status, OrderStatus::Signed));
    }

    let pay_record = payment::create(
        conn,
        current.id,
        PayMode::Charge,
        &request.title,
        request.amount,
        now,
    )
    .await?;
    let content = format!("Signed up: {} ({})", request.title, request.amount);
    let signup = notify::create(
        conn,
        current.id,
        current.org_id,
        NotifyKind::Signup,
        &content,
        author_id,
        now,
    )
    .await?;
    let order = load_order(conn, current.id).await?;

    Ok((SignUpOutcome { order, pay_record }, signup))
}

async fn close_unit(
    conn: &mut SqliteConnection,
    current: Order,
    to: OrderStatus,
    kind: NotifyKind,
    author_id: i64,
    now: i64,
) -> DispatchResult<CloseOutcome> {
    if !order::transition(conn, current.id, OrderStatus::Created, to, now).await? {
        let status = load_order(conn, current.id).await?.status;
        return Ok(CloseOutcome::Unchanged(status));
    }
    let content = format!("Order {} {}", current.id, to.as_str().to_lowercase());
    let row = notify::create(conn, current.id, current.org_id, kind, &content, author_id, now).await?;
    Ok(CloseOutcome::Closed(row))
}

async fn confirm_unit(
    conn: &mut SqliteConnection,
    ledger: StatisticsLedger,
    record: PayRecord,
    current: Order,
    decision: PayDecision,
    author_id: i64,
    now: i64,
) -> DispatchResult<(PayRecord, Option<OrderNotify>)> {
    let status = PayStatus::from(decision);
    if !payment::decide(conn, record.id, status, now).await? {
        let latest = payment::find_by_id(conn, record.id)
            .await?
            .map(|r| r.status)
            .unwrap_or(status);
        return Err(already_decided(record.id, latest));
    }

    let mut deposit = None;
    if decision == PayDecision::Confirmed {
        let lead = student::find_by_id(conn, current.student_id)
            .await?
            .ok_or_else(|| {
                DispatchError::InvalidEntity(format!("Student {} not found", current.student_id))
            })?;
        let performance = record.mode.performance(record.amount);
        let dimension = Dimension::new(KEY_ORDER)
            .org(current.org_id)
            .author(lead.author_id)
            .publisher(current.publisher_id);
        ledger
            .add_value(conn, &dimension, performance as f64, performance > 0)
            .await?;

        if record.mode == PayMode::Charge {
            let content = format!("Deposit confirmed: {} ({})", record.title, record.amount);
            deposit = Some(
                notify::create(
                    conn,
                    current.id,
                    current.org_id,
                    NotifyKind::Deposit,
                    &content,
                    author_id,
                    now,
                )
                .await?,
            );
        }
    }

    let decided = payment::find_by_id(conn, record.id)
        .await?
        .ok_or_else(|| DispatchError::NotFound(Resource::PayRecord, record.id))?;
    Ok((decided, deposit))
}

// ========== Helpers ==========

async fn load_order(conn: &mut SqliteConnection, order_id: i64) -> DispatchResult<Order> {
    order::find_by_id(conn, order_id)
        .await?
        .ok_or_else(|| DispatchError::NotFound(Resource::Order, order_id))
}

fn validate_payment(request: &PaymentRequest) -> DispatchResult<()> {
    validate_required_text(&request.title, "title", MAX_NAME_LEN)?;
    validate_amount(request.amount)
}

fn ensure_transition(current: &Order, to: OrderStatus) -> DispatchResult<()> {
    if current.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(invalid_transition(current.id, current.status, to))
    }
}

fn invalid_transition(order_id: i64, from: OrderStatus, to: OrderStatus) -> DispatchError {
    tracing::warn!(order_id, from = %from, to = %to, "Rejected order transition");
    DispatchError::InvalidState(format!("Order {order_id} is {from}, cannot move to {to}"))
}

fn already_decided(pay_id: i64, status: PayStatus) -> DispatchError {
    tracing::warn!(pay_id, status = ?status, "Pay record already decided");
    DispatchError::AlreadyDecided(format!("Pay record {pay_id} is already {status:?}"))
}
