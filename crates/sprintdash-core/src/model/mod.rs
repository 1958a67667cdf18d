//! Entity types mirrored from the upstream tracker.

pub mod snapshot;
pub mod sprint;
pub mod work_item;

pub use snapshot::{SnapshotCounts, SprintSnapshot};
pub use sprint::Sprint;
pub use work_item::WorkItem;
