//! Managed type, field, and root types.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::Address;

bitflags! {
    /// Type attribute flags as recorded by the runtime
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Instances are stored inline; the type has no pointer semantics
        const VALUE_TYPE = 0x0000_0001;
        /// The type is an array type
        const ARRAY = 0x0000_0002;
        /// Array rank, stored in the upper 16 bits
        const ARRAY_RANK_MASK = 0xFFFF_0000;
    }
}

impl TypeFlags
{
    /// Rank of an array type (0 for non-arrays).
    #[must_use]
    pub fn array_rank(self) -> u32
    {
        (self.bits() & Self::ARRAY_RANK_MASK.bits()) >> 16
    }
}

/// Stable table index of a managed type
///
/// Distinct from the runtime identity address: the index is what field
/// descriptions use to name their declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIndex(pub i32);

impl TypeIndex
{
    pub fn value(self) -> i32
    {
        self.0
    }
}

impl fmt::Display for TypeIndex
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}

/// Field of a managed type
///
/// The declared type is kept as an index and resolved on demand through the
/// type table, so fields never hold a reference to a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo
{
    pub name: String,
    /// Byte offset inside the instance (or the static storage). Negative means
    /// the field has no backing storage.
    pub offset: i32,
    /// Declared type of the field.
    pub type_index: TypeIndex,
    pub is_static: bool,
}

impl FieldInfo
{
    /// Offset as a buffer index, or `None` for the negative "no storage" sentinel.
    pub fn storage_offset(&self) -> Option<usize>
    {
        usize::try_from(self.offset).ok()
    }
}

/// Structured description of a managed type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedType
{
    pub flags: TypeFlags,
    pub name: String,
    pub assembly: String,
    /// Indices into the snapshot's field description list.
    pub field_indices: Vec<i32>,
    pub instance_fields: Vec<FieldInfo>,
    pub static_fields: Vec<FieldInfo>,
    /// Raw bytes of the type's static storage (may be empty).
    pub static_field_bytes: Vec<u8>,
    pub base_or_element_type_index: i32,
    /// Instance size in bytes.
    pub size: i32,
    /// Address the runtime uses to tag this type (the runtime identity address).
    pub type_info_address: Address,
    pub type_index: TypeIndex,
}

impl ManagedType
{
    pub fn is_array(&self) -> bool
    {
        self.flags.contains(TypeFlags::ARRAY)
    }

    pub fn is_value_type(&self) -> bool
    {
        self.flags.contains(TypeFlags::VALUE_TYPE)
    }

    /// Rank of the array type, 0 when not an array.
    pub fn array_rank(&self) -> u32
    {
        if self.is_array() {
            self.flags.array_rank()
        } else {
            0
        }
    }

    pub fn has_static_storage(&self) -> bool
    {
        !self.static_field_bytes.is_empty()
    }
}

/// Target of a GC handle: an address known to reference a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GcHandleRoot
{
    pub target: Address,
}

impl From<Address> for GcHandleRoot
{
    fn from(target: Address) -> Self
    {
        Self { target }
    }
}
