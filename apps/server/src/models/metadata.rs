use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scheduling bookkeeping for one configuration: the local (date, hour) of
/// the last decision to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// 0-23, in the configuration's timezone
    pub last_update_hour: u32,
    /// Serialized as `YYYY-MM-DD`
    pub last_update_date: NaiveDate,
}
