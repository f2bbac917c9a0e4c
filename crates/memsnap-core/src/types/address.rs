//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PointerWidth;
use crate::error::SnapshotError;

/// Strongly typed memory address
///
/// This wrapper around `u64` provides type safety when working with addresses
/// captured in a snapshot. It prevents accidentally mixing addresses with sizes,
/// offsets, or type indices, which are all plain integers in the raw snapshot.
///
/// ## Example
///
/// ```rust
/// use memsnap_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// Dereferencing an address outside every captured segment yields this value.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Returns `true` for the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use memsnap_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None); // Overflow
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Distance from `base` to this address, or `None` if this address lies below `base`.
    ///
    /// ```rust
    /// use memsnap_core::types::Address;
    ///
    /// assert_eq!(Address::from(0x1010).offset_from(Address::from(0x1000)), Some(0x10));
    /// assert_eq!(Address::from(0x0f00).offset_from(Address::from(0x1000)), None);
    /// ```
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }

    /// Add an offset to this address, saturating at the maximum value
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }

    /// Format the address zero-padded to the snapshot's pointer width
    ///
    /// A 4-byte snapshot renders 8 hex digits, an 8-byte snapshot renders 16.
    ///
    /// ```rust
    /// use memsnap_core::types::{Address, PointerWidth};
    ///
    /// let addr = Address::from(0xbeef);
    /// assert_eq!(addr.display_with(PointerWidth::Four).to_string(), "0x0000BEEF");
    /// assert_eq!(addr.display_with(PointerWidth::Eight).to_string(), "0x000000000000BEEF");
    /// ```
    pub fn display_with(self, width: PointerWidth) -> impl fmt::Display
    {
        WidthAddress { address: self, width }
    }
}

struct WidthAddress
{
    address: Address,
    width: PointerWidth,
}

impl fmt::Display for WidthAddress
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let digits = self.width.bytes() * 2;
        write!(f, "0x{:0digits$X}", self.address.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl FromStr for Address
{
    type Err = SnapshotError;

    /// Parse `0x`-prefixed hexadecimal or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u64>()
        };

        parsed
            .map(Address)
            .map_err(|err| SnapshotError::InvalidArgument(format!("invalid address '{s}': {err}")))
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
