pub mod poll_tick;
pub mod handoff_begin;
pub mod sim_step;
pub mod handoff_completed;
