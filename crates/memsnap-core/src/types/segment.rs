//! Captured memory segment types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Address;

/// Where a captured segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind
{
    /// Managed heap section
    Heap,
    /// Thread stack
    Stack,
}

impl fmt::Display for SegmentKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SegmentKind::Heap => write!(f, "heap"),
            SegmentKind::Stack => write!(f, "stack"),
        }
    }
}

/// Position of a segment inside the sorted segment store
///
/// Used by records that need to point back at the segment they were found in
/// without owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub usize);

impl SegmentId
{
    /// Get the raw index.
    pub fn value(self) -> usize
    {
        self.0
    }
}

/// Contiguous byte-backed range of captured memory
///
/// Immutable once created; owned by the segment store after ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySegment
{
    /// Address of the first captured byte
    pub start: Address,
    /// Copy of the memory contents
    pub bytes: Vec<u8>,
    /// Heap or stack origin
    pub kind: SegmentKind,
}

impl MemorySegment
{
    pub fn new(start: Address, bytes: Vec<u8>, kind: SegmentKind) -> Self
    {
        Self { start, bytes, kind }
    }

    /// Number of captured bytes.
    pub fn len(&self) -> u64
    {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }

    /// One-past-the-end address (`start + len`).
    pub fn end(&self) -> Address
    {
        self.start.saturating_add(self.len())
    }

    /// Containment test used by segment lookup
    ///
    /// The upper bound is inclusive: `start + len` itself counts as contained.
    ///
    /// ```rust
    /// use memsnap_core::types::{Address, MemorySegment, SegmentKind};
    ///
    /// let segment = MemorySegment::new(Address::from(0x100), vec![0; 16], SegmentKind::Heap);
    /// assert!(segment.contains(Address::from(0x100)));
    /// assert!(segment.contains(Address::from(0x110))); // one past the end
    /// assert!(!segment.contains(Address::from(0x111)));
    /// ```
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address <= self.end()
    }

    /// Offset of `address` from the segment start, if the segment contains it.
    pub fn offset_of(&self, address: Address) -> Option<usize>
    {
        if !self.contains(address) {
            return None;
        }
        address.offset_from(self.start).and_then(|offset| usize::try_from(offset).ok())
    }
}
