//! Auth snapshot cache adapter.

mod auth_snapshot;

pub use auth_snapshot::AuthSnapshotCache;
