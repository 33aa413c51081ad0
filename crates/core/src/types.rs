//! Identity and version types
//!
//! - [`LedgerId`]: unique identifier of a ledger record
//! - [`Version`]: optimistic-concurrency stamp, bumped by the store on every
//!   committed write

use serde::{Deserialize, Serialize};

/// Unique identifier for a ledger record
///
/// Assigned by the store at provisioning time and immutable afterwards.
///
/// # Examples
///
/// ```
/// use stockledger_core::LedgerId;
///
/// let id = LedgerId::new(7);
/// assert_eq!(id.as_u64(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerId(u64);

impl LedgerId {
    /// Wrap a raw identifier
    pub const fn new(raw: u64) -> Self {
        LedgerId(raw)
    }

    /// Raw identifier value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for LedgerId {
    fn from(raw: u64) -> Self {
        LedgerId(raw)
    }
}

impl std::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version stamp of a ledger record
///
/// Starts at 0 when the record is provisioned and increases by exactly 1 per
/// committed write. The value carries no meaning beyond equality comparison
/// at write time.
///
/// # Examples
///
/// ```
/// use stockledger_core::Version;
///
/// let v = Version::INITIAL;
/// assert_eq!(v.next(), Version::from(1u64));
/// assert!(v.next() > v);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly provisioned record
    pub const INITIAL: Version = Version(0);

    /// Raw version value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version a successful write produces
    pub const fn next(&self) -> Version {
        Version(self.0 + 1)
    }
}

impl From<u64> for Version {
    fn from(raw: u64) -> Self {
        Version(raw)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
