//! The versioned quantity record
//!
//! A [`LedgerRecord`] is a value snapshot: the store owns the authoritative
//! copy, everything else holds short-lived clones. The business rules for
//! moving the quantity live here so every layer applies them the same way.

use crate::error::LedgerError;
use crate::types::{LedgerId, Version};
use serde::{Deserialize, Serialize};

/// Stock on hand for one product
///
/// `quantity` is unsigned, so a negative balance cannot be represented.
/// `version` is stamped by the store and only compared, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Record identity
    pub id: LedgerId,
    /// Product this stock belongs to
    pub product_id: u64,
    /// Quantity on hand
    pub quantity: u64,
    /// Optimistic-concurrency stamp
    pub version: Version,
}

impl LedgerRecord {
    /// Create a freshly provisioned record at [`Version::INITIAL`]
    pub fn new(id: LedgerId, product_id: u64, quantity: u64) -> Self {
        Self {
            id,
            product_id,
            quantity,
            version: Version::INITIAL,
        }
    }

    /// Quantity left after taking `amount`
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is zero
    /// - [`LedgerError::InsufficientQuantity`] if `amount` exceeds the
    ///   quantity on hand
    ///
    /// # Examples
    ///
    /// ```
    /// use stockledger_core::{LedgerError, LedgerId, LedgerRecord};
    ///
    /// let record = LedgerRecord::new(LedgerId::new(1), 100, 10);
    /// assert_eq!(record.decreased_by(7), Ok(3));
    /// assert!(matches!(
    ///     record.decreased_by(11),
    ///     Err(LedgerError::InsufficientQuantity { .. })
    /// ));
    /// ```
    pub fn decreased_by(&self, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        self.quantity
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientQuantity {
                id: self.id,
                requested: amount,
                available: self.quantity,
            })
    }

    /// Quantity after adding `amount`
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if `amount` is zero
    /// - [`LedgerError::Overflow`] if the sum does not fit
    pub fn increased_by(&self, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }
        self.quantity
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { id: self.id })
    }
}
