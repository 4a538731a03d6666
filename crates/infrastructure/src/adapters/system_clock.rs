//! System clock adapter

use chrono::{DateTime, Utc};
use tessera_application::ports::Clock;

/// Wall clock used for token expiry and cookie max-age.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
