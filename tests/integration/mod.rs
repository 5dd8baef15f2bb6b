//! Integration tests for the versioned metadata core

mod gc_reachability;
mod history_walk;
mod linker_staging;
mod store_integration;
