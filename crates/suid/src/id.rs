use core::{fmt, str::FromStr};

use crate::{
    codec::{self, Format},
    error::{Error, Result},
};

/// The largest value a [`Suid`] may hold: `2^53 - 1`.
///
/// Identifiers are shared with hosts whose only numeric type is an IEEE-754
/// double, so every value must round-trip through one without loss.
pub const MAX_SAFE: u64 = (1 << 53) - 1;

/// Number of identifiers handed out from a single [`Block`].
pub const IDSIZE: u32 = 32;

/// Distance between two consecutive identifiers drawn from the same
/// [`Block`].
///
/// The gaps are reserved for sibling allocators sharing the numeric space with
/// a different offset. Changing this breaks compatibility with every block the
/// service has already granted.
pub const SHARDSIZE: u64 = 4;

/// A service-unique identifier.
///
/// A `Suid` is an immutable integer in `0..=MAX_SAFE`. Its canonical text form
/// is lowercase base-36 without padding, which is what [`fmt::Display`] and
/// [`Suid::encode`] produce and what [`FromStr`] accepts.
///
/// # Example
///
/// ```
/// use suid::Suid;
///
/// let id = Suid::new(1_903_154).unwrap();
/// assert_eq!(id.encode(), "14she");
/// assert_eq!("14she".parse::<Suid>().unwrap(), id);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Suid(u64);

impl Suid {
    /// The zero identifier, rendered as `"0"`.
    pub const ZERO: Self = Self(0);

    /// The largest representable identifier.
    pub const MAX: Self = Self(MAX_SAFE);

    /// Wraps `value` as a `Suid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `value` exceeds [`MAX_SAFE`].
    pub const fn new(value: u64) -> Result<Self> {
        if value > MAX_SAFE {
            return Err(Error::OutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Returns the underlying integer.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Renders this identifier in canonical base-36.
    pub fn encode(&self) -> String {
        codec::encode(self.0)
    }

    /// Parses a canonical base-36 string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if `text` is empty, contains
    /// characters outside the base-36 alphabet or decodes to a value above
    /// [`MAX_SAFE`].
    pub fn decode(text: &str) -> Result<Self> {
        Self::decode_as(Format::Base36, text)
    }

    /// Parses a compressed base-32 string written by older deployments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if `text` is not valid legacy
    /// base-32.
    pub fn decode_legacy(text: &str) -> Result<Self> {
        Self::decode_as(Format::Legacy, text)
    }

    /// Parses `text` using the codec selected by `format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEncoding`] if `text` is not valid in the given
    /// format.
    pub fn decode_as(format: Format, text: &str) -> Result<Self> {
        Ok(Self(format.decode(text)?))
    }
}

impl fmt::Display for Suid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Suid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl TryFrom<u64> for Suid {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Suid> for u64 {
    fn from(id: Suid) -> Self {
        id.0
    }
}

/// The first identifier of a contiguous range reserved for this client.
///
/// A block yields exactly [`IDSIZE`] identifiers, `first + k * SHARDSIZE` for
/// `k` in `0..IDSIZE`. Construction guarantees that the last of them is still
/// within [`MAX_SAFE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(Suid);

impl Block {
    /// Offset of the last identifier relative to the first.
    const SPAN: u64 = (IDSIZE as u64 - 1) * SHARDSIZE;

    /// Creates a block starting at `first`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the block would extend past
    /// [`MAX_SAFE`].
    pub const fn new(first: Suid) -> Result<Self> {
        if first.0 > MAX_SAFE - Self::SPAN {
            return Err(Error::OutOfRange { value: first.0 });
        }
        Ok(Self(first))
    }

    /// Creates a block from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the block would extend past
    /// [`MAX_SAFE`].
    pub fn from_raw(first: u64) -> Result<Self> {
        Self::new(Suid::new(first)?)
    }

    /// The first identifier of this block.
    pub const fn first(self) -> Suid {
        self.0
    }

    /// The identifier issued at position `index` within this block.
    ///
    /// Callers guarantee `index < IDSIZE`.
    pub(crate) const fn nth(self, index: u32) -> Suid {
        debug_assert!(index < IDSIZE);
        Suid(self.0.0 + index as u64 * SHARDSIZE)
    }

    /// Iterates over every identifier of this block, in issue order.
    pub fn ids(self) -> impl Iterator<Item = Suid> {
        (0..IDSIZE).map(move |k| self.nth(k))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Suid> for Block {
    type Error = Error;

    fn try_from(first: Suid) -> Result<Self> {
        Self::new(first)
    }
}
