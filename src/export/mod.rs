//! Deterministic JSON export: canonical encoding, hashing, structural diffs,
//! shape validation and dated on-disk snapshots.

pub mod diff;
pub mod hash;
pub mod json;
pub mod snapshot;
pub mod validate;

pub use diff::{ExportDiff, diff_exports};
pub use hash::hash_export;
pub use snapshot::{AuditedExport, SnapshotOutcome, build_audited_export, write_export_snapshot};
pub use validate::{ValidationReport, check_bundle_shape, validate_export};
