pub mod worker;

pub use worker::{process_configuration, run_tick, spawn_tick_loop, TickOutcome, TickSummary};
