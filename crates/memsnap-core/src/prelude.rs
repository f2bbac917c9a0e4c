//! Common module for library exports

pub use crate::address_map::{AddressMap, AddressRangeEntity, Nesting, RangeSource, SourceCoverage};
pub use crate::crawler::{CrawlStats, ManagedObjectRecord, ObjectCrawler, ObjectTable};
pub use crate::data::{FieldDescription, SegmentDescription, SnapshotData, TypeDescription};
pub use crate::error::{SnapshotError, SnapshotResult};
pub use crate::progress::{Progress, ProgressReceiver, ProgressSender, Stage, progress_channel};
pub use crate::resolver::{Dereference, PointerResolver};
pub use crate::segments::SegmentStore;
pub use crate::snapshot::Snapshot;
pub use crate::type_table::TypeTable;
pub use crate::types::*;
