//! # Segment Store
//!
//! Address-ordered collection of every captured heap and stack segment.
//!
//! The store answers one question: which captured segment (if any) holds the
//! bytes at a given address. Heap and stack sections are merged into a single
//! list sorted by start address, so a lookup is a binary search regardless of
//! where a segment came from.
//!
//! ## Containment
//!
//! The upper bound is inclusive: an address equal to `start + len` is reported
//! as belonging to the segment. Reads at that position have no bytes left and
//! resolve to 0 further up the stack.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::segments::SegmentStore;
//! use memsnap_core::types::{Address, MemorySegment, SegmentKind};
//!
//! let heap = vec![MemorySegment::new(Address::from(0x200), vec![0; 8], SegmentKind::Heap)];
//! let stack = vec![MemorySegment::new(Address::from(0x100), vec![0; 16], SegmentKind::Stack)];
//! let store = SegmentStore::new(heap, stack);
//!
//! assert_eq!(store.find(Address::from(0x204)).map(|s| s.start), Some(Address::from(0x200)));
//! assert!(store.find(Address::from(0x050)).is_none());
//! ```

use tracing::debug;

use crate::types::{Address, MemorySegment, SegmentId};

/// Sorted, immutable store of captured memory segments.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore
{
    segments: Vec<MemorySegment>,
}

impl SegmentStore
{
    /// Build the store from the heap and stack lists
    ///
    /// Both lists are concatenated (heap first) and sorted ascending by start
    /// address. The sort is stable, so segments sharing a start address keep
    /// their input order. Nothing is de-duplicated.
    pub fn new(heap: Vec<MemorySegment>, stack: Vec<MemorySegment>) -> Self
    {
        let mut segments = heap;
        segments.extend(stack);
        segments.sort_by_key(|segment| segment.start);

        debug!(
            "Segment store built: {} segments, {} bytes",
            segments.len(),
            segments.iter().map(MemorySegment::len).sum::<u64>()
        );

        Self { segments }
    }

    /// Find the segment containing `address`, together with its position in the store
    ///
    /// Picks the last segment starting at or below `address` and checks it for
    /// containment. When two segments touch (one ends exactly where the next
    /// begins) the shared address belongs to the later one.
    pub fn lookup(&self, address: Address) -> Option<(SegmentId, &MemorySegment)>
    {
        let candidates = self.segments.partition_point(|segment| segment.start <= address);
        let index = candidates.checked_sub(1)?;
        let segment = &self.segments[index];
        segment.contains(address).then_some((SegmentId(index), segment))
    }

    /// Find the segment containing `address`.
    pub fn find(&self, address: Address) -> Option<&MemorySegment>
    {
        self.lookup(address).map(|(_, segment)| segment)
    }

    /// Get a segment by its position in the store.
    pub fn get(&self, id: SegmentId) -> Option<&MemorySegment>
    {
        self.segments.get(id.value())
    }

    /// Iterate over the segments in address order.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &MemorySegment)>
    {
        self.segments.iter().enumerate().map(|(index, segment)| (SegmentId(index), segment))
    }

    pub fn len(&self) -> usize
    {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.segments.is_empty()
    }

    /// Total number of captured bytes across all segments.
    pub fn total_bytes(&self) -> u64
    {
        self.segments.iter().map(MemorySegment::len).sum()
    }
}
