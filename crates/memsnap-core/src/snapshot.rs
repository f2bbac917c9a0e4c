//! # Snapshot
//!
//! Owns every store built from one snapshot description and runs the build
//! pipeline.
//!
//! Construction happens once, in a fixed order, and reports a coarse
//! percentage at the start of each stage (see [`Stage`]). After
//! [`Snapshot::build`] returns, everything is read-only; two snapshots never
//! share state.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::data::{SegmentDescription, SnapshotData};
//! use memsnap_core::progress::progress_channel;
//! use memsnap_core::snapshot::Snapshot;
//! use memsnap_core::types::Address;
//!
//! let mut data = SnapshotData::default();
//! data.heap.push(SegmentDescription { start_address: Address::from(0x1000), bytes: vec![0; 64] });
//! data.gc_handle_targets.push(Address::from(0x1000));
//!
//! let (sender, receiver) = progress_channel();
//! let snapshot = Snapshot::build(data, Some(&sender)).unwrap();
//! drop(sender);
//!
//! assert_eq!(snapshot.objects().len(), 1);
//! assert_eq!(receiver.iter().last().map(|p| p.percent), Some(100));
//! ```

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::address_map::{AddressMap, AddressRangeEntity, RangeSource};
use crate::crawler::{ManagedObjectRecord, ObjectCrawler, ObjectTable};
use crate::data::{SegmentDescription, SnapshotData};
use crate::error::SnapshotResult;
use crate::progress::{ProgressSender, Stage, report};
use crate::resolver::PointerResolver;
use crate::segments::SegmentStore;
use crate::type_table::TypeTable;
use crate::types::{
    Address, GcHandleRoot, ManagedType, MemorySegment, NativeAllocation, NativeMemoryRegion, NativeObject,
    NativeTypeName, PointerWidth, RootReference, SegmentKind, VirtualMachineInfo,
};

/// Fully built, immutable model of one snapshot
#[derive(Debug, Clone)]
pub struct Snapshot
{
    vm: VirtualMachineInfo,
    width: PointerWidth,
    native_types: Vec<NativeTypeName>,
    native_objects: Vec<NativeObject>,
    native_allocations: Vec<NativeAllocation>,
    root_references: HashMap<i64, RootReference>,
    memory_regions: Vec<NativeMemoryRegion>,
    types: TypeTable,
    segments: SegmentStore,
    gc_handles: Vec<GcHandleRoot>,
    objects: ObjectTable,
    address_map: AddressMap,
}

impl Snapshot
{
    /// Build every store from `data`, reporting progress to `observer`
    ///
    /// ## Errors
    ///
    /// Returns [`SnapshotError::UnsupportedPointerSize`](crate::error::SnapshotError::UnsupportedPointerSize)
    /// if the virtual machine descriptor has a pointer size other than 4 or 8.
    /// Nothing is built in that case.
    pub fn build(data: SnapshotData, observer: Option<&ProgressSender>) -> SnapshotResult<Self>
    {
        report(observer, Stage::Started);
        let vm = data.vm;
        let width = vm.pointer_width()?;
        info!("Building {} snapshot model", width);

        report(observer, Stage::NativeTypes);
        let native_types = data.native_types;

        report(observer, Stage::NativeObjects);
        let mut native_objects = data.native_objects;
        native_objects.sort_by_key(|object| object.address);

        report(observer, Stage::NativeAllocations);
        let mut native_allocations = data.native_allocations;
        native_allocations.sort_by_key(|allocation| allocation.address);

        report(observer, Stage::RootReferences);
        let root_references = index_root_references(data.root_references);

        report(observer, Stage::MemoryRegions);
        let memory_regions = data.memory_regions;

        let types = TypeTable::from_descriptions_reporting(&data.types, &data.field_descriptions, observer);

        report(observer, Stage::HeapSegments);
        let heap = into_segments(data.heap, SegmentKind::Heap);

        report(observer, Stage::StackSegments);
        let stack = into_segments(data.stack, SegmentKind::Stack);

        report(observer, Stage::SegmentStore);
        let segments = SegmentStore::new(heap, stack);

        report(observer, Stage::GcHandles);
        let gc_handles: Vec<GcHandleRoot> = data.gc_handle_targets.into_iter().map(GcHandleRoot::from).collect();
        debug!("{} GC handles", gc_handles.len());

        report(observer, Stage::Crawl);
        let objects = ObjectCrawler::new(PointerResolver::with_width(&segments, &types, vm, width)).crawl(&gc_handles);

        report(observer, Stage::AddressMap);
        let address_map = AddressMap::build(&memory_regions, &native_allocations, &native_objects, &segments);

        report(observer, Stage::Complete);
        info!(
            "Snapshot built: {} types, {} segments, {} objects, {} address ranges",
            types.len(),
            segments.len(),
            objects.len(),
            address_map.len()
        );

        Ok(Self {
            vm,
            width,
            native_types,
            native_objects,
            native_allocations,
            root_references,
            memory_regions,
            types,
            segments,
            gc_handles,
            objects,
            address_map,
        })
    }

    /// Read a JSON description from `path` and build it.
    ///
    /// ## Errors
    ///
    /// Any loading error from [`SnapshotData::load`] or build error from
    /// [`Snapshot::build`].
    pub fn load(path: impl AsRef<Path>, observer: Option<&ProgressSender>) -> SnapshotResult<Self>
    {
        Self::build(SnapshotData::load(path)?, observer)
    }

    pub fn vm(&self) -> &VirtualMachineInfo
    {
        &self.vm
    }

    pub fn pointer_width(&self) -> PointerWidth
    {
        self.width
    }

    pub fn segments(&self) -> &SegmentStore
    {
        &self.segments
    }

    pub fn types(&self) -> &TypeTable
    {
        &self.types
    }

    /// Crawled managed objects, in discovery order.
    pub fn objects(&self) -> &ObjectTable
    {
        &self.objects
    }

    pub fn address_map(&self) -> &AddressMap
    {
        &self.address_map
    }

    pub fn gc_handles(&self) -> &[GcHandleRoot]
    {
        &self.gc_handles
    }

    pub fn native_types(&self) -> &[NativeTypeName]
    {
        &self.native_types
    }

    /// Native objects, sorted by address.
    pub fn native_objects(&self) -> &[NativeObject]
    {
        &self.native_objects
    }

    /// Native allocations, sorted by address.
    pub fn native_allocations(&self) -> &[NativeAllocation]
    {
        &self.native_allocations
    }

    /// Native memory regions, in snapshot order.
    pub fn memory_regions(&self) -> &[NativeMemoryRegion]
    {
        &self.memory_regions
    }

    pub fn root_reference(&self, id: i64) -> Option<&RootReference>
    {
        self.root_references.get(&id)
    }

    pub fn root_reference_count(&self) -> usize
    {
        self.root_references.len()
    }

    /// Native type of a native object.
    pub fn native_type_of(&self, object: &NativeObject) -> Option<&NativeTypeName>
    {
        usize::try_from(object.native_type_index).ok().and_then(|index| self.native_types.get(index))
    }

    /// Memory region a native allocation was made from.
    pub fn region_of(&self, allocation: &NativeAllocation) -> Option<&NativeMemoryRegion>
    {
        usize::try_from(allocation.memory_region_index)
            .ok()
            .and_then(|index| self.memory_regions.get(index))
    }

    /// Resolved type of a crawled object.
    pub fn type_of(&self, record: &ManagedObjectRecord) -> Option<&ManagedType>
    {
        record.resolved_type.and_then(|index| self.types.by_index(index))
    }

    /// Pointer resolver over this snapshot's stores.
    pub fn resolver(&self) -> PointerResolver<'_>
    {
        PointerResolver::with_width(&self.segments, &self.types, self.vm, self.width)
    }

    /// Object crawler over this snapshot's stores.
    pub fn crawler(&self) -> ObjectCrawler<'_>
    {
        ObjectCrawler::new(self.resolver())
    }

    /// Render an address with the snapshot's pointer width.
    pub fn format_address(&self, address: Address) -> String
    {
        address.display_with(self.width).to_string()
    }

    /// Short human-readable name of an address map entry.
    pub fn range_label(&self, entity: &AddressRangeEntity) -> String
    {
        match entity.source {
            RangeSource::Region(index) => self
                .memory_regions
                .get(index)
                .map_or_else(|| format!("region #{index}"), |region| format!("region {}", region.name)),
            RangeSource::NativeAllocation(index) => {
                let root = self
                    .native_allocations
                    .get(index)
                    .and_then(|allocation| self.root_reference(allocation.root_reference_id));
                match root {
                    Some(root) => format!("allocation {} ({})", root.object_name, root.area_name),
                    None => format!("allocation #{index}"),
                }
            }
            RangeSource::NativeObject(index) => self.native_objects.get(index).map_or_else(
                || format!("native object #{index}"),
                |object| {
                    let type_name = self.native_type_of(object).map_or("?", |ty| ty.name.as_str());
                    format!("native object {} [{}]", object.name, type_name)
                },
            ),
            RangeSource::ManagedSegment(id) => self
                .segments
                .get(id)
                .map_or_else(|| format!("segment #{}", id.value()), |segment| format!("managed {}", segment.kind)),
        }
    }
}

fn index_root_references(references: Vec<RootReference>) -> HashMap<i64, RootReference>
{
    let mut by_id = HashMap::with_capacity(references.len());
    for reference in references {
        if by_id.contains_key(&reference.id) {
            warn!("Duplicate root reference id {}, keeping the first", reference.id);
            continue;
        }
        by_id.insert(reference.id, reference);
    }
    by_id
}

fn into_segments(descriptions: Vec<SegmentDescription>, kind: SegmentKind) -> Vec<MemorySegment>
{
    descriptions.into_iter().map(|description| description.into_segment(kind)).collect()
}
