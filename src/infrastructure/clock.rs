use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Source of the current instant. Stored timestamps are UTC; day boundaries are
/// computed in whatever zone the caller passes to [`Clock::today_in`].
#[derive(Clone)]
pub struct Clock {
    now_provider: NowProvider,
}

impl Clock {
    pub fn system() -> Self {
        Self {
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn fixed(instant: DateTime<Utc>) -> Self {
        Self::with_now_provider(Arc::new(move || instant))
    }

    pub fn with_now_provider(now_provider: NowProvider) -> Self {
        Self { now_provider }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn today_in<Z: TimeZone>(&self, zone: &Z) -> NaiveDate {
        self.now().with_timezone(zone).date_naive()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").field("now", &self.now()).finish()
    }
}
