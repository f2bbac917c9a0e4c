//! # Object Crawler
//!
//! Enumerates managed objects from the snapshot's fixed roots.
//!
//! Two kinds of roots are visited, in this order:
//!
//! 1. **GC handle targets** whose address lies in a captured segment.
//! 2. **Static field slots**: for every type with static storage, every static
//!    field that is neither a value type nor storage-less is read as a pointer.
//!
//! Each discovered address is turned into exactly one [`ManagedObjectRecord`];
//! the first root to reach an address wins and later discoveries are only
//! counted. Instance fields are not followed, so the result is the root set,
//! not the transitive closure.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::crawler::ObjectCrawler;
//! use memsnap_core::resolver::PointerResolver;
//! use memsnap_core::segments::SegmentStore;
//! use memsnap_core::type_table::TypeTable;
//! use memsnap_core::types::{Address, GcHandleRoot, VirtualMachineInfo};
//!
//! let segments = SegmentStore::default();
//! let types = TypeTable::default();
//! let resolver = PointerResolver::new(&segments, &types, VirtualMachineInfo::default()).unwrap();
//!
//! let table = ObjectCrawler::new(resolver).crawl(&[GcHandleRoot::from(Address::from(0x1000))]);
//! assert!(table.is_empty()); // the handle points outside every segment
//! ```

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::resolver::{PointerResolver, UNRESOLVED_ARRAY_LENGTH};
use crate::types::{Address, GcHandleRoot, ManagedType, SegmentId, TypeIndex, VirtualMachineInfo};

/// What the crawler knows about one discovered address
///
/// A record with no resolved type is still a valid record: the address was
/// reached from a root, its header just did not match a known type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObjectRecord
{
    pub address: Address,
    /// Segment that contains the address, if any.
    pub segment: Option<SegmentId>,
    /// Offset of the address inside `segment` (0 when unmapped).
    pub offset: usize,
    /// First pointer-sized word at the address.
    pub header_word: Address,
    /// Type matched directly by the header word.
    pub header_type: Option<TypeIndex>,
    /// Type matched after following the header word one more level.
    pub resolved_type: Option<TypeIndex>,
    pub is_array: bool,
    /// Element count for single-dimension arrays, otherwise
    /// [`UNRESOLVED_ARRAY_LENGTH`].
    pub array_length: i32,
}

impl ManagedObjectRecord
{
    /// Size of the object header in front of this object's data.
    pub fn header_size(&self, vm: &VirtualMachineInfo) -> u32
    {
        if self.is_array {
            vm.array_header_size
        } else {
            vm.object_header_size
        }
    }

    pub fn is_resolved(&self) -> bool
    {
        self.resolved_type.is_some()
    }
}

/// Counters collected during one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats
{
    /// GC handle roots whose target lies in a captured segment.
    pub gc_handle_roots: usize,
    /// GC handle roots skipped because no segment covers the target.
    pub unmapped_handles: usize,
    /// Static field slots read as pointers.
    pub static_field_roots: usize,
    /// Roots that reached an address already in the table.
    pub duplicates: usize,
    /// Records inserted without a resolved type.
    pub unresolved: usize,
}

impl fmt::Display for CrawlStats
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{} handle roots ({} unmapped), {} static roots, {} duplicates, {} unresolved",
            self.gc_handle_roots, self.unmapped_handles, self.static_field_roots, self.duplicates, self.unresolved
        )
    }
}

/// Crawl output: records keyed by address, in discovery order
#[derive(Debug, Clone, Default)]
pub struct ObjectTable
{
    records: IndexMap<Address, ManagedObjectRecord>,
    stats: CrawlStats,
}

impl ObjectTable
{
    pub fn get(&self, address: Address) -> Option<&ManagedObjectRecord>
    {
        self.records.get(&address)
    }

    pub fn contains(&self, address: Address) -> bool
    {
        self.records.contains_key(&address)
    }

    /// Iterate over the records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ManagedObjectRecord>
    {
        self.records.values()
    }

    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty()
    }

    pub fn stats(&self) -> &CrawlStats
    {
        &self.stats
    }

    /// Insert a record for a new address.
    fn insert(&mut self, record: ManagedObjectRecord)
    {
        if record.resolved_type.is_none() {
            self.stats.unresolved += 1;
        }
        self.records.insert(record.address, record);
    }
}

/// Root walker over one snapshot's stores
#[derive(Debug, Clone, Copy)]
pub struct ObjectCrawler<'a>
{
    resolver: PointerResolver<'a>,
}

impl<'a> ObjectCrawler<'a>
{
    pub fn new(resolver: PointerResolver<'a>) -> Self
    {
        Self { resolver }
    }

    /// Build the record for `address`
    ///
    /// Never fails. The first dereference supplies the segment, offset and
    /// header word; the header word is matched directly (`header_type`) and
    /// then dereferenced once more, and that second word decides
    /// `resolved_type` and `is_array`.
    pub fn inspect_address(&self, address: Address) -> ManagedObjectRecord
    {
        let resolver = &self.resolver;

        let header = resolver.dereference(address);
        let header_type = resolver.type_at(header.value);
        let class = resolver.dereference(header.value);
        let resolved = resolver.type_at(class.value);

        let is_array = resolved.is_some_and(ManagedType::is_array);
        let array_length = if is_array {
            header
                .segment
                .and_then(|id| resolver.segments().get(id))
                .map_or(UNRESOLVED_ARRAY_LENGTH, |segment| resolver.read_array_length(segment, header.offset))
        } else {
            UNRESOLVED_ARRAY_LENGTH
        };

        ManagedObjectRecord {
            address,
            segment: header.segment,
            offset: header.offset,
            header_word: header.value,
            header_type: header_type.map(|ty| ty.type_index),
            resolved_type: resolved.map(|ty| ty.type_index),
            is_array,
            array_length,
        }
    }

    /// Visit every root and collect one record per unique address.
    pub fn crawl(&self, gc_handles: &[GcHandleRoot]) -> ObjectTable
    {
        let mut table = ObjectTable::default();
        self.crawl_gc_handles(gc_handles, &mut table);
        self.crawl_static_fields(&mut table);

        info!("Crawled {} managed objects: {}", table.len(), table.stats);
        table
    }

    /// Record `address` unless an earlier root already reached it.
    fn visit(&self, address: Address, table: &mut ObjectTable)
    {
        if table.contains(address) {
            table.stats.duplicates += 1;
        } else {
            table.insert(self.inspect_address(address));
        }
    }

    fn crawl_gc_handles(&self, gc_handles: &[GcHandleRoot], table: &mut ObjectTable)
    {
        for handle in gc_handles {
            if self.resolver.segments().find(handle.target).is_none() {
                table.stats.unmapped_handles += 1;
                continue;
            }
            table.stats.gc_handle_roots += 1;
            self.visit(handle.target, table);
        }
    }

    fn crawl_static_fields(&self, table: &mut ObjectTable)
    {
        let types = self.resolver.types();
        let width = self.resolver.width();

        for ty in types.iter().filter(|ty| ty.has_static_storage()) {
            for field in &ty.static_fields {
                let Some(declared) = types.field_type(field) else {
                    warn!(
                        "Static field {}.{} has unknown declared type {}, skipping",
                        ty.name, field.name, field.type_index
                    );
                    continue;
                };
                if declared.is_value_type() {
                    continue;
                }
                let Some(offset) = field.storage_offset() else {
                    continue;
                };
                let Some(pointer) = width.read(&ty.static_field_bytes, offset) else {
                    debug!(
                        "Static field {}.{} at offset {} is outside {} bytes of static storage",
                        ty.name,
                        field.name,
                        offset,
                        ty.static_field_bytes.len()
                    );
                    continue;
                };

                table.stats.static_field_roots += 1;
                self.visit(Address::from(pointer), table);
            }
        }
    }
}
