use chrono::{DateTime, Utc};

use pw_core::ports::ClockPort;

/// Wall-clock backed [`ClockPort`].
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
