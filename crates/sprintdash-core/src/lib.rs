//! sprintdash-core library.
//!
//! Mirrored sprint data (sprints, work items, daily snapshots) lives behind
//! the [`store::SnapshotStore`] interface. The [`reconcile`] routines repair
//! snapshot counters against the work items' lifecycle timestamps.

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod model;
pub mod reconcile;
pub mod store;

