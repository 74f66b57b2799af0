//! Order notifications (派单通知)
//!
//! Notify rows are written inside the same transaction as the order change
//! that produced them. After commit the manager publishes them on the
//! [`NotifyHub`]; a [`NotifyWorker`] forwards them to a delivery sink.

mod hub;
mod worker;

pub use hub::{NotifyHub, DEFAULT_NOTIFY_CAPACITY};
pub use worker::{LogDelivery, NotifyDelivery, NotifyWorker};
