pub mod logger;
pub mod time;
pub mod validation;

pub use time::{Clock, SharedClock, SystemClock};
