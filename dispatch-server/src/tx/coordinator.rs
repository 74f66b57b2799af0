//! Transaction Coordinator
//!
//! Runs a unit of work inside one SQLite transaction on its own task, bounded
//! by a deadline, with panic containment:
//!
//! - work returns `Ok`  → commit (commit failure is returned as a storage error)
//! - work returns `Err` → rollback, the error is returned unchanged
//! - work panics        → the dropped transaction rolls back, `InternalPanic`
//! - deadline fires     → the task is cancelled at its next await point and
//!   rolls back; the caller gets `DeadlineExceeded`
//!
//! A `DeadlineExceeded` result means "outcome unknown": if the unit of work
//! was already committing when the deadline fired, its writes may be visible.

use crate::error::{DispatchError, DispatchResult};
use futures::future::BoxFuture;
use sqlx::{SqliteConnection, SqlitePool};
use std::any::Any;
use std::time::Duration;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Default deadline for one unit of work
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(8);

/// How long the caller waits for a cancelled unit of work to roll back
const ROLLBACK_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct TxCoordinator {
    pool: SqlitePool,
    timeout: Duration,
}

impl TxCoordinator {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `work` in a transaction with the configured deadline
    pub async fn run<T, F>(&self, work: F) -> DispatchResult<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, DispatchResult<T>>
            + Send
            + 'static,
        T: Send + 'static,
    {
        self.run_with_timeout(self.timeout, work).await
    }

    /// Run `work` in a transaction with an explicit deadline
    pub async fn run_with_timeout<T, F>(&self, timeout: Duration, work: F) -> DispatchResult<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, DispatchResult<T>>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let mut handle = tokio::spawn(execute_unit(
            self.pool.clone(),
            work,
            cancel.clone(),
            timeout,
        ));

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Transaction deadline exceeded, cancelling unit of work"
                );
                match tokio::time::timeout(ROLLBACK_GRACE, &mut handle).await {
                    Ok(Ok(Ok(_))) => tracing::warn!(
                        "Unit of work committed after the deadline; reporting DeadlineExceeded"
                    ),
                    Ok(_) => tracing::debug!("Cancelled unit of work rolled back"),
                    Err(_) => {
                        handle.abort();
                        tracing::error!(
                            grace_ms = ROLLBACK_GRACE.as_millis() as u64,
                            "Unit of work did not stop after cancellation, outcome unknown"
                        );
                    }
                }
                Err(DispatchError::DeadlineExceeded(timeout))
            }
        }
    }
}

async fn execute_unit<T, F>(
    pool: SqlitePool,
    work: F,
    cancel: CancellationToken,
    timeout: Duration,
) -> DispatchResult<T>
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, DispatchResult<T>>,
{
    let mut tx = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DispatchError::DeadlineExceeded(timeout)),
        tx = pool.begin() => tx?,
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = work(&mut *tx) => Some(res),
    };

    match outcome {
        Some(Ok(value)) => {
            tx.commit().await?;
            Ok(value)
        }
        Some(Err(err)) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after unit of work error");
            }
            Err(err)
        }
        None => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after cancellation");
            }
            Err(DispatchError::DeadlineExceeded(timeout))
        }
    }
}

fn flatten<T>(joined: Result<DispatchResult<T>, JoinError>) -> DispatchResult<T> {
    match joined {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic());
            tracing::error!(panic = %message, "Unit of work panicked, transaction rolled back");
            Err(DispatchError::InternalPanic(message))
        }
        Err(join_err) => Err(DispatchError::InternalPanic(join_err.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
