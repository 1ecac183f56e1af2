//! VMobile subscriber consolidation and weekly qualification pipeline.
//!
//! The decision-making core is pure and in-memory:
//! `normalize` → `reconcile` → `dedup`, and `usage` → `weekly_report`.
//! Stages, the store and the table reader wrap it for batch runs.

pub mod analysis_stage;
pub mod config;
pub mod consolidation_stage;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod event;
pub mod load_stage;
pub mod normalize;
pub mod reconcile;
pub mod report_stage;
pub mod stage;
pub mod store;
pub mod subscriber;
pub mod table;
pub mod types;
pub mod usage;
pub mod weekly_report;
