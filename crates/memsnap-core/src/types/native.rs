//! Native-side snapshot tables: types, objects, allocations, roots, regions.

use serde::{Deserialize, Serialize};

use super::Address;

/// Name of a native (engine-side) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTypeName
{
    pub name: String,
    /// Index of the base type in the native type list, negative for none.
    pub base_type_index: i32,
}

/// Native object instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeObject
{
    pub name: String,
    pub instance_id: i32,
    pub size: u64,
    /// Index into the native type list.
    pub native_type_index: i32,
    #[serde(default)]
    pub hide_flags: u32,
    #[serde(default)]
    pub flags: u32,
    pub root_reference_id: i64,
    pub address: Address,
}

/// Native heap allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeAllocation
{
    /// Index into the native memory region list.
    pub memory_region_index: i32,
    pub root_reference_id: i64,
    #[serde(default)]
    pub allocation_site_id: i64,
    pub address: Address,
    pub size: u64,
    #[serde(default)]
    pub overhead_size: i32,
    #[serde(default)]
    pub padding_size: i32,
}

/// Named root that accounts for native memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootReference
{
    pub id: i64,
    pub area_name: String,
    pub object_name: String,
    pub accumulated_size: u64,
}

/// Native memory region reserved by an allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMemoryRegion
{
    pub name: String,
    /// Index of the enclosing region, negative for top-level regions.
    pub parent_index: i32,
    pub address_base: Address,
    pub address_size: u64,
    #[serde(default)]
    pub first_allocation_index: i32,
    #[serde(default)]
    pub num_allocations: i32,
}
