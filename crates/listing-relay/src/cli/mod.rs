//! CLI subcommand implementations for the listing-relay binary.

pub mod backfill_cmd;
pub mod inspect_cmd;
pub mod output;
pub mod requeue_cmd;
pub mod run_cmd;
