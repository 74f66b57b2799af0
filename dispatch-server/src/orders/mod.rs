//! Order lifecycle (派单生命周期)
//!
//! ```text
//! create_order ──► CREATED ──sign_up──► SIGNED
//!                     │
//!                     ├──revoke────► REVOKED
//!                     └──invalidate► INVALID
//! ```
//!
//! Every mutation authorizes before opening its transaction, then applies a
//! compare-and-set transition together with its pay records, notifies and
//! ledger rows in one unit of work.

pub mod auth;
mod manager;

pub use manager::{OrderManager, SignUpOutcome};
