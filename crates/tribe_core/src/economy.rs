//! Gem ledger.
//!
//! One counter is shared by the whole session. It is charged when a
//! facility placement is committed and when a training job starts.

use serde::{Deserialize, Serialize};

/// The session's gem balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Ledger {
    gems: u32,
}

impl Ledger {
    /// Create a ledger holding `gems`.
    #[must_use]
    pub const fn new(gems: u32) -> Self {
        Self { gems }
    }

    /// Current balance.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.gems
    }

    /// Check if a cost is covered.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.gems >= cost
    }

    /// Withdraw `cost` if it is covered.
    ///
    /// Returns true if the withdrawal happened. A failed withdrawal leaves
    /// the balance untouched.
    pub fn withdraw(&mut self, cost: u32) -> bool {
        if self.can_afford(cost) {
            self.gems -= cost;
            true
        } else {
            false
        }
    }

    /// Add gems, saturating at `u32::MAX`.
    pub fn deposit(&mut self, amount: u32) {
        self.gems = self.gems.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_exact_amount() {
        let mut ledger = Ledger::new(45);
        assert!(ledger.withdraw(10));
        assert_eq!(ledger.balance(), 35);
    }

    #[test]
    fn test_withdraw_insufficient_is_untouched() {
        let mut ledger = Ledger::new(3);
        assert!(!ledger.withdraw(4));
        assert_eq!(ledger.balance(), 3);
        assert!(ledger.withdraw(3));
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn test_deposit_saturates() {
        let mut ledger = Ledger::new(u32::MAX - 1);
        ledger.deposit(5);
        assert_eq!(ledger.balance(), u32::MAX);
    }
}
