//! Conflict detection
//!
//! One rule: a write may proceed iff the record's stored version still equals
//! the version the transaction read. Any mismatch is a conflict requiring a
//! full retry from a fresh read. Values written by other transactions are
//! never inspected or merged.
//!
//! [`validate_read_set`] is an early, lock-free check run before the batch
//! commit. It can only produce false negatives (a conflict that appears after
//! validation); the store's batch commit is the authoritative check.

use stockledger_core::{LedgerId, RecordStore, StoreError, Version};

/// Why a transaction cannot commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// Another transaction committed to a record after we read it
    ReadWriteConflict {
        /// Contended record
        id: LedgerId,
        /// Version this transaction read
        read_version: Version,
        /// Version now stored
        current_version: Version,
    },
    /// The record was deleted after we read it
    Deleted {
        /// Removed record
        id: LedgerId,
    },
}

impl ConflictType {
    /// Record the conflict is about
    pub fn id(&self) -> LedgerId {
        match self {
            ConflictType::ReadWriteConflict { id, .. } | ConflictType::Deleted { id } => *id,
        }
    }

    /// Classify a store rejection; `None` for failures that are not conflicts
    pub fn from_store_error(e: &StoreError) -> Option<Self> {
        match *e {
            StoreError::NotFound(id) => Some(ConflictType::Deleted { id }),
            StoreError::VersionMismatch {
                id,
                expected,
                actual,
            } => Some(ConflictType::ReadWriteConflict {
                id,
                read_version: expected,
                current_version: actual,
            }),
            StoreError::Unavailable(_) => None,
        }
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::ReadWriteConflict {
                id,
                read_version,
                current_version,
            } => write!(
                f,
                "record {} read at {} but now at {}",
                id, read_version, current_version
            ),
            ConflictType::Deleted { id } => write!(f, "record {} was deleted", id),
        }
    }
}

/// Outcome of validating a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Every conflict found; empty means valid
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Valid result
    pub fn ok() -> Self {
        Self::default()
    }

    /// Whether the transaction may proceed to commit
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// First conflict, if any
    pub fn first(&self) -> Option<ConflictType> {
        self.conflicts.first().copied()
    }
}

/// The conflict-detection rule for a single record
///
/// # Examples
///
/// ```
/// use stockledger_concurrency::check_version;
/// use stockledger_core::{LedgerId, Version};
///
/// let id = LedgerId::new(1);
/// assert!(check_version(id, Version::from(2u64), Version::from(2u64)).is_ok());
/// assert!(check_version(id, Version::from(2u64), Version::from(3u64)).is_err());
/// ```
pub fn check_version(id: LedgerId, read_version: Version, current: Version) -> Result<(), ConflictType> {
    if read_version == current {
        Ok(())
    } else {
        Err(ConflictType::ReadWriteConflict {
            id,
            read_version,
            current_version: current,
        })
    }
}

/// Compare every read version against the store
///
/// Store failures other than a missing record are not conflicts and are
/// left for the authoritative commit to report.
pub fn validate_read_set<S, I>(read_set: I, store: &S) -> ValidationResult
where
    S: RecordStore + ?Sized,
    I: IntoIterator<Item = (LedgerId, Version)>,
{
    let mut result = ValidationResult::ok();
    for (id, read_version) in read_set {
        match store.read(id) {
            Ok(current) => {
                if let Err(conflict) = check_version(id, read_version, current.version) {
                    result.conflicts.push(conflict);
                }
            }
            Err(StoreError::NotFound(id)) => result.conflicts.push(ConflictType::Deleted { id }),
            Err(_) => {}
        }
    }
    result
}
