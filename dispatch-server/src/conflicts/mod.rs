//! Duplicate lead resolution (撞单处理)
//!
//! A telephone can be entered by several operators. Intake decides the new
//! record's status from the most recent earlier record and the challenge
//! window; an open [`StudentConflict`](shared::models::StudentConflict)
//! tracks the group until an operator resolves it.

mod intake;
mod resolver;

pub use intake::{DEFAULT_CHALLENGE_WINDOW_DAYS, intake_status};
pub use resolver::ConflictResolver;
