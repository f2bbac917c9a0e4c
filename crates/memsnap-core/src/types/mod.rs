//! # Types
//!
//! Plain data types shared by every stage of the snapshot model.
//!
//! These are the entities the stores are built from: addresses, captured
//! segments, managed types and their fields, native tables, and the virtual
//! machine layout descriptor.

pub mod address;
pub mod managed;
pub mod native;
pub mod segment;
pub mod vm;

// Re-export all public types
pub use address::Address;
pub use managed::{FieldInfo, GcHandleRoot, ManagedType, TypeFlags, TypeIndex};
pub use native::{NativeAllocation, NativeMemoryRegion, NativeObject, NativeTypeName, RootReference};
pub use segment::{MemorySegment, SegmentId, SegmentKind};
pub use vm::{PointerWidth, VirtualMachineInfo};
