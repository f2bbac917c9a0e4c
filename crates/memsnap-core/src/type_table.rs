//! # Type Table
//!
//! Managed types indexed by runtime identity address and by stable type index.
//!
//! Both indices are built once from the snapshot description and never change
//! afterwards. Fields refer to their declared type by index; the table is what
//! turns that index back into a type.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::data::{FieldDescription, TypeDescription};
use crate::progress::{ProgressSender, Stage, report};
use crate::types::{Address, FieldInfo, ManagedType, TypeFlags, TypeIndex};

/// Immutable lookup structure over all managed types of a snapshot
#[derive(Debug, Clone, Default)]
pub struct TypeTable
{
    types: Vec<ManagedType>,
    by_address: HashMap<Address, usize>,
    by_index: HashMap<TypeIndex, usize>,
}

impl TypeTable
{
    /// Build the table from already-assembled types
    ///
    /// When two types claim the same runtime identity address or the same type
    /// index, the first one keeps the slot and the collision is logged.
    pub fn new(types: Vec<ManagedType>) -> Self
    {
        let mut by_address = HashMap::with_capacity(types.len());
        let mut by_index = HashMap::with_capacity(types.len());

        for (position, ty) in types.iter().enumerate() {
            if let Some(&existing) = by_address.get(&ty.type_info_address) {
                let existing: &ManagedType = &types[existing];
                warn!(
                    "Type '{}' shares runtime address {} with '{}', keeping the first",
                    ty.name, ty.type_info_address, existing.name
                );
            } else {
                by_address.insert(ty.type_info_address, position);
            }

            if let Some(&existing) = by_index.get(&ty.type_index) {
                let existing: &ManagedType = &types[existing];
                warn!(
                    "Type '{}' shares type index {} with '{}', keeping the first",
                    ty.name, ty.type_index, existing.name
                );
            } else {
                by_index.insert(ty.type_index, position);
            }
        }

        Self {
            types,
            by_address,
            by_index,
        }
    }

    /// Assemble types from their snapshot descriptions
    ///
    /// Each type's field indices are resolved against `fields` and split into
    /// instance and static fields. Indices that point outside `fields` are
    /// skipped with a warning.
    pub fn from_descriptions(types: &[TypeDescription], fields: &[FieldDescription]) -> Self
    {
        Self::from_descriptions_reporting(types, fields, None)
    }

    /// Same as [`TypeTable::from_descriptions`], reporting each step
    ///
    /// [`Stage::ManagedTypes`] is reported before the types are read,
    /// [`Stage::FieldDescriptions`] before their fields are resolved and split,
    /// and [`Stage::FieldTypes`] before declared field types are checked
    /// against the finished table.
    pub fn from_descriptions_reporting(
        types: &[TypeDescription],
        fields: &[FieldDescription],
        observer: Option<&ProgressSender>,
    ) -> Self
    {
        report(observer, Stage::ManagedTypes);
        let mut assembled: Vec<ManagedType> = types.iter().map(managed_type).collect();

        report(observer, Stage::FieldDescriptions);
        for ty in &mut assembled {
            attach_fields(ty, fields);
        }

        report(observer, Stage::FieldTypes);
        let table = Self::new(assembled);
        let unresolved = table.unresolved_field_types();
        if unresolved > 0 {
            warn!("{} fields declare a type index missing from the type table", unresolved);
        }
        debug!("Type table built: {} types, {} field descriptions", table.len(), fields.len());
        table
    }

    /// Number of fields, instance and static, whose declared type is not in the table.
    pub fn unresolved_field_types(&self) -> usize
    {
        self.types
            .iter()
            .flat_map(|ty| ty.instance_fields.iter().chain(&ty.static_fields))
            .filter(|field| self.field_type(field).is_none())
            .count()
    }

    /// Look up a type by its runtime identity address.
    pub fn by_address(&self, address: Address) -> Option<&ManagedType>
    {
        self.by_address.get(&address).map(|&position| &self.types[position])
    }

    /// Look up a type by its stable type index.
    pub fn by_index(&self, index: TypeIndex) -> Option<&ManagedType>
    {
        self.by_index.get(&index).map(|&position| &self.types[position])
    }

    /// Resolve the declared type of a field.
    pub fn field_type(&self, field: &FieldInfo) -> Option<&ManagedType>
    {
        self.by_index(field.type_index)
    }

    /// Iterate over the types in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = &ManagedType>
    {
        self.types.iter()
    }

    pub fn len(&self) -> usize
    {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.types.is_empty()
    }
}

fn managed_type(description: &TypeDescription) -> ManagedType
{
    ManagedType {
        flags: TypeFlags::from_bits_retain(description.flags),
        name: description.name.clone(),
        assembly: description.assembly.clone(),
        field_indices: description.field_indices.clone(),
        instance_fields: Vec::new(),
        static_fields: Vec::new(),
        static_field_bytes: description.static_field_bytes.clone(),
        base_or_element_type_index: description.base_or_element_type_index,
        size: description.size,
        type_info_address: description.type_info_address,
        type_index: description.type_index,
    }
}

fn attach_fields(ty: &mut ManagedType, fields: &[FieldDescription])
{
    for &field_index in &ty.field_indices {
        let Some(field) = usize::try_from(field_index).ok().and_then(|i| fields.get(i)) else {
            warn!(
                "Type '{}' references field index {} outside {} field descriptions",
                ty.name,
                field_index,
                fields.len()
            );
            continue;
        };

        let info = FieldInfo {
            name: field.name.clone(),
            offset: field.offset,
            type_index: field.type_index,
            is_static: field.is_static,
        };
        if info.is_static {
            ty.static_fields.push(info);
        } else {
            ty.instance_fields.push(info);
        }
    }
}
