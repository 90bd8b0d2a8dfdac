pub mod boundary;
pub mod file;
pub mod naming;
pub mod shape;

pub use boundary::{Boundary, BoundarySelector, HardCutReason};
pub use file::{FileReport, FileSplitter, PlannedSegment, SegmentRecord};
pub use naming::{short_hash, IdentityNamer, SegmentIdentity, HASH_LEN};
pub use shape::{SegmentShaper, FADE_MS, PADDING_MS};
