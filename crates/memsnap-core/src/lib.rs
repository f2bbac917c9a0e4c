//! # memsnap-core
//!
//! Address-indexed model of a managed-runtime memory snapshot.
//!
//! This crate takes an already-decoded snapshot description (native tables,
//! managed type metadata and raw copies of heap and stack memory) and builds:
//! - A segment store answering "which captured bytes hold this address"
//! - A type table keyed by runtime identity address and by type index
//! - A pointer resolver that reads header words and recovers managed types
//! - An object crawler that enumerates objects reachable from GC handles and
//!   static fields
//! - A unified address map over native regions, allocations, objects and
//!   managed segments
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::prelude::*;
//!
//! let mut bytes = vec![0u8; 64];
//! bytes[..8].copy_from_slice(&0x2000u64.to_le_bytes());
//!
//! let mut data = SnapshotData::default();
//! data.heap.push(SegmentDescription { start_address: Address::from(0x1000), bytes });
//! data.gc_handle_targets.push(Address::from(0x1000));
//!
//! let snapshot = Snapshot::build(data, None)?;
//! let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
//! assert_eq!(record.header_word, Address::from(0x2000));
//! # Ok::<(), SnapshotError>(())
//! ```
//!
//! ## Resolution misses
//!
//! Most addresses in a snapshot cannot be resolved: native-only pointers,
//! stale handles, garbage. None of that is an error. Lookups return `Option`,
//! dereferences outside captured memory return the null address, and crawled
//! records may carry no type. The only fatal condition is a pointer size
//! other than 4 or 8.

pub mod address_map;
pub mod crawler;
pub mod data;
pub mod error;
pub mod prelude;
pub mod progress;
pub mod resolver;
pub mod segments;
pub mod snapshot;
pub mod type_table;
pub mod types;

// Re-export commonly used types
pub use error::{SnapshotError, SnapshotResult};
pub use snapshot::Snapshot;
