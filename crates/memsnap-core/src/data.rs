//! # Snapshot Description
//!
//! The structured, already-decoded form of a snapshot: every table the
//! container carries, before any index or store has been built from it.
//!
//! Decoding the binary container is done elsewhere. This module only defines
//! the shape that decoder hands over, and can read that shape back from JSON so
//! a description can be stored next to the capture and re-analysed later.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::data::SnapshotData;
//!
//! let json = r#"{ "vm": { "pointerSize": 8, "objectHeaderSize": 16, "arrayHeaderSize": 32,
//!                         "arrayBoundsOffsetInHeader": 16, "arraySizeOffsetInHeader": 24 } }"#;
//! let data = SnapshotData::from_json_slice(json.as_bytes()).unwrap();
//! assert_eq!(data.vm.pointer_size, 8);
//! assert!(data.heap.is_empty());
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotResult;
use crate::types::{
    Address, MemorySegment, NativeAllocation, NativeMemoryRegion, NativeObject, NativeTypeName, RootReference,
    SegmentKind, TypeIndex, VirtualMachineInfo,
};

/// Managed type entry as it appears in the snapshot
///
/// Fields are referenced by index into [`SnapshotData::field_descriptions`];
/// they are split into instance and static fields when the type table is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescription
{
    /// Raw type attribute bits (see [`TypeFlags`](crate::types::TypeFlags)).
    pub flags: u32,
    pub name: String,
    #[serde(default)]
    pub assembly: String,
    #[serde(default)]
    pub field_indices: Vec<i32>,
    #[serde(default)]
    pub static_field_bytes: Vec<u8>,
    #[serde(default = "no_type_index")]
    pub base_or_element_type_index: i32,
    #[serde(default)]
    pub size: i32,
    pub type_info_address: Address,
    pub type_index: TypeIndex,
}

fn no_type_index() -> i32
{
    -1
}

/// Field entry as it appears in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription
{
    pub name: String,
    pub offset: i32,
    pub type_index: TypeIndex,
    pub is_static: bool,
}

/// Raw captured memory section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDescription
{
    pub start_address: Address,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl SegmentDescription
{
    /// Turn the description into an owned segment of the given kind.
    pub fn into_segment(self, kind: SegmentKind) -> MemorySegment
    {
        MemorySegment::new(self.start_address, self.bytes, kind)
    }
}

/// Decoded snapshot, as handed over by the container decoder
///
/// Every list is optional in JSON and defaults to empty; only the virtual
/// machine descriptor is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData
{
    pub vm: VirtualMachineInfo,
    #[serde(default)]
    pub native_types: Vec<NativeTypeName>,
    #[serde(default)]
    pub native_objects: Vec<NativeObject>,
    #[serde(default)]
    pub native_allocations: Vec<NativeAllocation>,
    #[serde(default)]
    pub root_references: Vec<RootReference>,
    #[serde(default)]
    pub memory_regions: Vec<NativeMemoryRegion>,
    #[serde(default)]
    pub types: Vec<TypeDescription>,
    #[serde(default)]
    pub field_descriptions: Vec<FieldDescription>,
    #[serde(default)]
    pub heap: Vec<SegmentDescription>,
    #[serde(default)]
    pub stack: Vec<SegmentDescription>,
    #[serde(default)]
    pub gc_handle_targets: Vec<Address>,
}

impl SnapshotData
{
    /// Parse a description from JSON bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`SnapshotError::Json`](crate::error::SnapshotError::Json) if the
    /// bytes are not a valid description.
    pub fn from_json_slice(bytes: &[u8]) -> SnapshotResult<Self>
    {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read a description from a JSON file.
    ///
    /// ## Errors
    ///
    /// Returns [`SnapshotError::Io`](crate::error::SnapshotError::Io) if the file
    /// cannot be read, or [`SnapshotError::Json`](crate::error::SnapshotError::Json)
    /// if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        tracing::debug!("Read {} bytes of snapshot description from {}", bytes.len(), path.display());
        Self::from_json_slice(&bytes)
    }
}
