//! # Pointer Resolver
//!
//! Reads raw captured bytes as pointers and recovers managed type identity.
//!
//! Every managed object starts with a header word. In the runtimes this tool
//! reads, that word points (directly, or through one extra level of
//! indirection) at the runtime identity record of the object's type. The
//! resolver follows those pointers through the segment store and matches the
//! result against the type table.
//!
//! The resolver holds only shared references to the two stores and has no
//! state of its own: every call is a pure function of the snapshot.
//!
//! ## Example
//!
//! ```rust
//! use memsnap_core::resolver::PointerResolver;
//! use memsnap_core::segments::SegmentStore;
//! use memsnap_core::type_table::TypeTable;
//! use memsnap_core::types::{Address, MemorySegment, SegmentKind, VirtualMachineInfo};
//!
//! let mut bytes = vec![0u8; 16];
//! bytes[..8].copy_from_slice(&0x2000u64.to_le_bytes());
//! let segments = SegmentStore::new(vec![MemorySegment::new(Address::from(0x1000), bytes, SegmentKind::Heap)], Vec::new());
//! let types = TypeTable::default();
//!
//! let resolver = PointerResolver::new(&segments, &types, VirtualMachineInfo::default()).unwrap();
//! let deref = resolver.dereference(Address::from(0x1000));
//! assert_eq!(deref.value, Address::from(0x2000));
//! assert_eq!(deref.offset, 0);
//!
//! // Outside every segment: the null sentinel, not an error.
//! assert!(resolver.dereference(Address::from(0x9000)).value.is_null());
//! ```

use crate::error::SnapshotResult;
use crate::segments::SegmentStore;
use crate::type_table::TypeTable;
use crate::types::vm::read_i32;
use crate::types::{Address, ManagedType, MemorySegment, PointerWidth, SegmentId, VirtualMachineInfo};

/// Maximum number of header words followed while resolving a type.
pub const MAX_TYPE_RESOLVE_DEPTH: usize = 2;

/// Array length reported when the length cannot be recovered (multi-rank arrays).
pub const UNRESOLVED_ARRAY_LENGTH: i32 = 0;

/// Result of reading one pointer out of captured memory
///
/// When the address is not covered by any segment this is
/// `{ value: 0, segment: None, offset: 0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dereference
{
    /// The pointer-sized value stored at the address (0 when unreadable).
    pub value: Address,
    /// Segment that contains the address.
    pub segment: Option<SegmentId>,
    /// Offset of the address inside that segment.
    pub offset: usize,
}

impl Dereference
{
    const UNMAPPED: Self = Self {
        value: Address::ZERO,
        segment: None,
        offset: 0,
    };

    /// Returns `true` if the address was covered by a captured segment.
    pub fn is_mapped(&self) -> bool
    {
        self.segment.is_some()
    }
}

/// Stateless pointer reader bound to one snapshot's stores
#[derive(Debug, Clone, Copy)]
pub struct PointerResolver<'a>
{
    segments: &'a SegmentStore,
    types: &'a TypeTable,
    vm: VirtualMachineInfo,
    width: PointerWidth,
}

impl<'a> PointerResolver<'a>
{
    /// Create a resolver over the given stores.
    ///
    /// ## Errors
    ///
    /// Returns [`SnapshotError::UnsupportedPointerSize`](crate::error::SnapshotError::UnsupportedPointerSize)
    /// when `vm.pointer_size` is not 4 or 8.
    pub fn new(segments: &'a SegmentStore, types: &'a TypeTable, vm: VirtualMachineInfo) -> SnapshotResult<Self>
    {
        let width = vm.pointer_width()?;
        Ok(Self::with_width(segments, types, vm, width))
    }

    /// Create a resolver with an already validated pointer width.
    pub(crate) fn with_width(
        segments: &'a SegmentStore,
        types: &'a TypeTable,
        vm: VirtualMachineInfo,
        width: PointerWidth,
    ) -> Self
    {
        Self {
            segments,
            types,
            vm,
            width,
        }
    }

    pub fn segments(&self) -> &'a SegmentStore
    {
        self.segments
    }

    pub fn types(&self) -> &'a TypeTable
    {
        self.types
    }

    pub fn vm(&self) -> &VirtualMachineInfo
    {
        &self.vm
    }

    pub fn width(&self) -> PointerWidth
    {
        self.width
    }

    /// Read a pointer from `segment` at `offset`, `None` if it runs past the end.
    pub fn read_pointer(&self, segment: &MemorySegment, offset: usize) -> Option<Address>
    {
        self.width.read(&segment.bytes, offset).map(Address::from)
    }

    /// Read the pointer stored at `address`
    ///
    /// A covered address whose remaining bytes are shorter than a pointer
    /// (the inclusive one-past-end case) yields value 0 but still reports its
    /// segment and offset.
    pub fn dereference(&self, address: Address) -> Dereference
    {
        let Some((id, segment)) = self.segments.lookup(address) else {
            return Dereference::UNMAPPED;
        };
        let Some(offset) = segment.offset_of(address) else {
            return Dereference::UNMAPPED;
        };

        Dereference {
            value: self.read_pointer(segment, offset).unwrap_or(Address::ZERO),
            segment: Some(id),
            offset,
        }
    }

    /// Match a header word against the type table. The null word never matches.
    pub fn type_at(&self, word: Address) -> Option<&'a ManagedType>
    {
        if word.is_null() {
            return None;
        }
        self.types.by_address(word)
    }

    /// Resolve the managed type of the object at `address`
    ///
    /// Reads the header word and looks it up. On a miss, the header word is
    /// itself dereferenced and the lookup retried, up to
    /// [`MAX_TYPE_RESOLVE_DEPTH`] words in total.
    pub fn resolve_type(&self, address: Address) -> Option<&'a ManagedType>
    {
        let mut word = self.dereference(address).value;
        for _ in 1..MAX_TYPE_RESOLVE_DEPTH {
            if let Some(ty) = self.type_at(word) {
                return Some(ty);
            }
            word = self.dereference(word).value;
        }
        self.type_at(word)
    }

    /// Element count of the array whose header starts at `offset` in `segment`
    ///
    /// Only single-dimension arrays (null bounds pointer) carry a readable
    /// length; anything else reports [`UNRESOLVED_ARRAY_LENGTH`].
    pub fn read_array_length(&self, segment: &MemorySegment, offset: usize) -> i32
    {
        let header_offset = |field: u32| usize::try_from(field).ok().and_then(|field| offset.checked_add(field));

        let bounds = header_offset(self.vm.array_bounds_offset_in_header)
            .and_then(|bounds_offset| self.read_pointer(segment, bounds_offset));
        match bounds {
            Some(bounds) if bounds.is_null() => header_offset(self.vm.array_size_offset_in_header)
                .and_then(|size_offset| read_i32(&segment.bytes, size_offset))
                .unwrap_or(UNRESOLVED_ARRAY_LENGTH),
            _ => UNRESOLVED_ARRAY_LENGTH,
        }
    }
}
