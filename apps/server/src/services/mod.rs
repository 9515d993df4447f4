pub mod configuration;
pub mod date_limits;
pub mod patcher;
pub mod quota;
pub mod schedule;

pub use configuration::{ApplyOutcome, ConfigurationService, SaveOutcome};
pub use date_limits::{compute_boundary, local_date};
pub use patcher::{plan_update, PatchResult, PatchService, PlannedUpdate};
pub use quota::QuotaService;
pub use schedule::{is_due, ScheduleDecision, ScheduleService};
