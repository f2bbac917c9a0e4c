//! # Unified Address Map
//!
//! One address-ordered view over every address-ranged entity in a snapshot:
//! native memory regions, native allocations, native objects and captured
//! managed segments.
//!
//! Entries are sorted by start address, then by end address. On top of the
//! ordered list, [`AddressMap::classify_nesting`] attributes each entry to at
//! most one enclosing entry with a single left-to-right pass. That pass only
//! remembers the entry that most recently pushed the running end address
//! forward, so it describes one level of nesting and can mis-attribute deeper
//! or irregular containment.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::address_map::{AddressMap, AddressRangeEntity, RangeSource};
//! use memsnap_core::types::Address;
//!
//! let map = AddressMap::from_entities(vec![
//!     AddressRangeEntity::new(Address::from(0), 100, RangeSource::Region(0)),
//!     AddressRangeEntity::new(Address::from(10), 20, RangeSource::Region(1)),
//! ]);
//! let nesting = map.classify_nesting();
//! assert_eq!(nesting[0].parent, None);
//! assert_eq!(nesting[1].parent, Some(0));
//! ```

use std::fmt;

use crate::segments::SegmentStore;
use crate::types::{Address, NativeAllocation, NativeMemoryRegion, NativeObject, SegmentId};

/// Which list an address-ranged entity came from, and its position there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSource
{
    /// Index into the native memory region list.
    Region(usize),
    /// Index into the (address-sorted) native allocation list.
    NativeAllocation(usize),
    /// Index into the (address-sorted) native object list.
    NativeObject(usize),
    /// Captured managed heap or stack segment.
    ManagedSegment(SegmentId),
}

impl fmt::Display for RangeSource
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            RangeSource::Region(index) => write!(f, "region[{index}]"),
            RangeSource::NativeAllocation(index) => write!(f, "allocation[{index}]"),
            RangeSource::NativeObject(index) => write!(f, "object[{index}]"),
            RangeSource::ManagedSegment(id) => write!(f, "segment[{}]", id.value()),
        }
    }
}

/// One address range in the unified map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRangeEntity
{
    pub start: Address,
    pub size: u64,
    pub source: RangeSource,
}

impl AddressRangeEntity
{
    pub fn new(start: Address, size: u64, source: RangeSource) -> Self
    {
        Self { start, size, source }
    }

    /// One-past-the-end address.
    pub fn end(&self) -> Address
    {
        self.start.saturating_add(self.size)
    }
}

/// Nesting classification of one map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nesting
{
    /// Row number among non-empty entries.
    pub index: usize,
    /// Position of the entry in [`AddressMap::entries`].
    pub entry: usize,
    /// Row number of the enclosing entry, `None` for top-level entries.
    pub parent: Option<usize>,
}

/// Bytes covered per source kind, zero-size entries excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCoverage
{
    pub regions: u64,
    pub native_allocations: u64,
    pub native_objects: u64,
    pub managed_segments: u64,
}

/// Ordered list of every address-ranged entity in a snapshot
#[derive(Debug, Clone, Default)]
pub struct AddressMap
{
    entries: Vec<AddressRangeEntity>,
}

impl AddressMap
{
    /// Build the map from the four source lists
    ///
    /// Sources are concatenated in argument order and then stably sorted by
    /// `(start, end)`, so identical ranges keep that order.
    pub fn build(
        regions: &[NativeMemoryRegion],
        allocations: &[NativeAllocation],
        objects: &[NativeObject],
        segments: &SegmentStore,
    ) -> Self
    {
        let regions = regions
            .iter()
            .enumerate()
            .map(|(i, region)| AddressRangeEntity::new(region.address_base, region.address_size, RangeSource::Region(i)));
        let allocations = allocations
            .iter()
            .enumerate()
            .map(|(i, alloc)| AddressRangeEntity::new(alloc.address, alloc.size, RangeSource::NativeAllocation(i)));
        let objects = objects
            .iter()
            .enumerate()
            .map(|(i, object)| AddressRangeEntity::new(object.address, object.size, RangeSource::NativeObject(i)));
        let segments = segments
            .iter()
            .map(|(id, segment)| AddressRangeEntity::new(segment.start, segment.len(), RangeSource::ManagedSegment(id)));

        Self::from_entities(regions.chain(allocations).chain(objects).chain(segments).collect())
    }

    /// Build the map from an arbitrary entity list.
    pub fn from_entities(mut entries: Vec<AddressRangeEntity>) -> Self
    {
        entries.sort_by_key(|entry| (entry.start, entry.end()));
        tracing::debug!("Address map built: {} entries", entries.len());
        Self { entries }
    }

    /// Attribute each non-empty entry to at most one enclosing entry
    ///
    /// Walks the ordered list keeping the largest end address seen so far and
    /// the entry that produced it. An entry starting strictly below that end is
    /// nested under that entry; otherwise it is top-level. Zero-size entries
    /// are left out of the result, take no row number and do not move the
    /// running end.
    pub fn classify_nesting(&self) -> Vec<Nesting>
    {
        let mut result = Vec::with_capacity(self.entries.len());
        let mut last_end = Address::ZERO;
        let mut last_index = None;

        for (position, entry) in self.entries.iter().enumerate() {
            if entry.size == 0 {
                continue;
            }

            let index = result.len();
            let parent = if entry.start < last_end { last_index } else { None };
            result.push(Nesting {
                index,
                entry: position,
                parent,
            });

            if entry.end() > last_end {
                last_end = entry.end();
                last_index = Some(index);
            }
        }

        result
    }

    /// Total bytes covered by each source kind.
    pub fn coverage_by_source(&self) -> SourceCoverage
    {
        let mut coverage = SourceCoverage::default();
        for entry in self.entries.iter().filter(|entry| entry.size > 0) {
            let bucket = match entry.source {
                RangeSource::Region(_) => &mut coverage.regions,
                RangeSource::NativeAllocation(_) => &mut coverage.native_allocations,
                RangeSource::NativeObject(_) => &mut coverage.native_objects,
                RangeSource::ManagedSegment(_) => &mut coverage.managed_segments,
            };
            *bucket = bucket.saturating_add(entry.size);
        }
        coverage
    }

    /// Entries in `(start, end)` order.
    pub fn entries(&self) -> &[AddressRangeEntity]
    {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&AddressRangeEntity>
    {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn region(start: u64, size: u64, index: usize) -> AddressRangeEntity
    {
        AddressRangeEntity::new(Address::from(start), size, RangeSource::Region(index))
    }

    #[test]
    fn test_sorted_by_start_then_end()
    {
        let map = AddressMap::from_entities(vec![region(10, 50, 0), region(0, 5, 1), region(10, 20, 2)]);
        let order: Vec<RangeSource> = map.entries().iter().map(|e| e.source).collect();
        assert_eq!(order, vec![RangeSource::Region(1), RangeSource::Region(2), RangeSource::Region(0)]);
    }

    #[test]
    fn test_zero_size_entries_are_skipped()
    {
        let map = AddressMap::from_entities(vec![region(0, 100, 0), region(10, 0, 1), region(20, 10, 2)]);
        let nesting = map.classify_nesting();
        assert_eq!(nesting.len(), 2);
        assert_eq!(
            nesting[1],
            Nesting {
                index: 1,
                entry: 2,
                parent: Some(0)
            }
        );
    }

    #[test]
    fn test_rows_after_empty_entry_stay_dense()
    {
        // [0,100) [5,5) [10,30) [200,210) [205,0) [205,215)
        let map = AddressMap::from_entities(vec![
            region(0, 100, 0),
            region(5, 0, 1),
            region(10, 20, 2),
            region(200, 10, 3),
            region(205, 0, 4),
            region(205, 10, 5),
        ]);
        let nesting = map.classify_nesting();
        let rows: Vec<(usize, usize, Option<usize>)> = nesting.iter().map(|n| (n.index, n.entry, n.parent)).collect();
        assert_eq!(rows, vec![(0, 0, None), (1, 2, Some(0)), (2, 3, None), (3, 5, Some(2))]);
    }

    #[test]
    fn test_adjacent_ranges_are_top_level()
    {
        let map = AddressMap::from_entities(vec![region(0, 16, 0), region(16, 16, 1)]);
        let nesting = map.classify_nesting();
        assert_eq!(nesting[1].parent, None);
    }

    #[test]
    fn test_parent_is_last_extending_entry()
    {
        // [0,100) then [50,150) extends the end; [60,70) is attributed to the second
        let map = AddressMap::from_entities(vec![region(0, 100, 0), region(50, 100, 1), region(60, 10, 2)]);
        let nesting = map.classify_nesting();
        assert_eq!(nesting[1].parent, Some(0));
        assert_eq!(nesting[2].parent, Some(1));
    }

    #[test]
    fn test_coverage_by_source()
    {
        let map = AddressMap::from_entities(vec![
            region(0, 100, 0),
            AddressRangeEntity::new(Address::from(10), 20, RangeSource::NativeAllocation(0)),
            AddressRangeEntity::new(Address::from(12), 0, RangeSource::NativeObject(0)),
            AddressRangeEntity::new(Address::from(0x1000), 64, RangeSource::ManagedSegment(SegmentId(0))),
        ]);
        let coverage = map.coverage_by_source();
        assert_eq!(coverage.regions, 100);
        assert_eq!(coverage.native_allocations, 20);
        assert_eq!(coverage.native_objects, 0);
        assert_eq!(coverage.managed_segments, 64);
    }
}
