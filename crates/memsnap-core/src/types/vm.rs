//! Virtual machine layout descriptor and pointer width.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SnapshotError, SnapshotResult};

/// Layout facts about the runtime that produced the snapshot
///
/// Accompanies every snapshot. The pointer size decides how every header word
/// and static field slot is read; the header sizes and offsets are needed to
/// interpret object and array headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInfo
{
    /// Size of a pointer in the captured process, in bytes (4 or 8).
    pub pointer_size: u32,
    /// Size of the header in front of every managed object.
    pub object_header_size: u32,
    /// Size of the header in front of every managed array.
    pub array_header_size: u32,
    /// Offset of the bounds pointer inside an array header.
    pub array_bounds_offset_in_header: u32,
    /// Offset of the element count inside an array header.
    pub array_size_offset_in_header: u32,
    /// Allocation granularity of the managed heap.
    #[serde(default)]
    pub allocation_granularity: u32,
}

impl VirtualMachineInfo
{
    /// Validate the pointer size into a [`PointerWidth`].
    ///
    /// ## Errors
    ///
    /// Returns [`SnapshotError::UnsupportedPointerSize`] for anything other than 4 or 8.
    pub fn pointer_width(&self) -> SnapshotResult<PointerWidth>
    {
        PointerWidth::try_from(self.pointer_size)
    }
}

impl Default for VirtualMachineInfo
{
    /// Layout of a 64-bit runtime.
    fn default() -> Self
    {
        Self {
            pointer_size: 8,
            object_header_size: 16,
            array_header_size: 32,
            array_bounds_offset_in_header: 16,
            array_size_offset_in_header: 24,
            allocation_granularity: 16,
        }
    }
}

/// Width of a pointer in the captured process
///
/// Fixed once per snapshot. All pointers are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth
{
    /// 32-bit process
    Four,
    /// 64-bit process
    Eight,
}

impl PointerWidth
{
    /// Size of a pointer in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize
    {
        match self {
            PointerWidth::Four => 4,
            PointerWidth::Eight => 8,
        }
    }

    /// Read a little-endian pointer from `bytes` at `offset`
    ///
    /// Returns `None` when fewer than [`bytes()`](Self::bytes) bytes remain at
    /// `offset`.
    ///
    /// ```rust
    /// use memsnap_core::types::PointerWidth;
    ///
    /// let buffer = [0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    /// assert_eq!(PointerWidth::Eight.read(&buffer, 0), Some(0x2000));
    /// assert_eq!(PointerWidth::Four.read(&buffer, 4), Some(0));
    /// assert_eq!(PointerWidth::Eight.read(&buffer, 1), None);
    /// ```
    #[must_use]
    pub fn read(self, bytes: &[u8], offset: usize) -> Option<u64>
    {
        let end = offset.checked_add(self.bytes())?;
        let slice = bytes.get(offset..end)?;
        match self {
            PointerWidth::Four => {
                let raw: [u8; 4] = slice.try_into().ok()?;
                Some(u64::from(u32::from_le_bytes(raw)))
            }
            PointerWidth::Eight => {
                let raw: [u8; 8] = slice.try_into().ok()?;
                Some(u64::from_le_bytes(raw))
            }
        }
    }
}

impl TryFrom<u32> for PointerWidth
{
    type Error = SnapshotError;

    fn try_from(size: u32) -> Result<Self, Self::Error>
    {
        match size {
            4 => Ok(PointerWidth::Four),
            8 => Ok(PointerWidth::Eight),
            other => Err(SnapshotError::UnsupportedPointerSize(other)),
        }
    }
}

impl fmt::Display for PointerWidth
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}-bit", self.bytes() * 8)
    }
}

/// Read a little-endian `i32` from `bytes` at `offset`.
pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> Option<i32>
{
    let end = offset.checked_add(4)?;
    let raw: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(i32::from_le_bytes(raw))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_pointer_width_from_size()
    {
        assert_eq!(PointerWidth::try_from(4).unwrap(), PointerWidth::Four);
        assert_eq!(PointerWidth::try_from(8).unwrap(), PointerWidth::Eight);
        assert!(matches!(
            PointerWidth::try_from(2),
            Err(SnapshotError::UnsupportedPointerSize(2))
        ));
        assert!(PointerWidth::try_from(16).is_err());
    }

    #[test]
    fn test_pointer_round_trip_eight()
    {
        let mut buffer = vec![0u8; 24];
        let value: u64 = 0x0123_4567_89ab_cdef;
        buffer[8..16].copy_from_slice(&value.to_le_bytes());
        assert_eq!(PointerWidth::Eight.read(&buffer, 8), Some(value));
    }

    #[test]
    fn test_pointer_round_trip_four()
    {
        let mut buffer = vec![0u8; 12];
        let value: u32 = 0xdead_beef;
        buffer[4..8].copy_from_slice(&value.to_le_bytes());
        assert_eq!(PointerWidth::Four.read(&buffer, 4), Some(u64::from(value)));
    }

    #[test]
    fn test_read_past_end_is_none()
    {
        let buffer = [0u8; 8];
        assert_eq!(PointerWidth::Eight.read(&buffer, 8), None);
        assert_eq!(PointerWidth::Four.read(&buffer, 6), None);
        assert_eq!(PointerWidth::Eight.read(&buffer, usize::MAX), None);
    }

    #[test]
    fn test_read_i32()
    {
        let buffer = (-5i32).to_le_bytes();
        assert_eq!(read_i32(&buffer, 0), Some(-5));
        assert_eq!(read_i32(&buffer, 1), None);
    }

    #[test]
    fn test_vm_pointer_width()
    {
        let vm = VirtualMachineInfo {
            pointer_size: 3,
            ..VirtualMachineInfo::default()
        };
        assert!(vm.pointer_width().is_err());
        assert_eq!(VirtualMachineInfo::default().pointer_width().unwrap(), PointerWidth::Eight);
    }
}
