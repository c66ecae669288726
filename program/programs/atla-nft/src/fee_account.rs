use tracing::info;

use crate::errors::{AtlaError, Result};

/// Prepaid fee balance held by the service, debited per randomness request.
#[derive(Debug, Clone, Default)]
pub struct FeeAccount {
    balance: u64,
}

impl FeeAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// External top-up. Returns the new balance.
    pub fn credit(&mut self, amount: u64) -> Result<u64> {
        let old_balance = self.balance;
        self.balance = old_balance
            .checked_add(amount)
            .ok_or(AtlaError::CounterOverflow)?;

        info!(old_balance, new_balance = self.balance, "Fee account credited");
        Ok(self.balance)
    }

    /// Debit `amount` if the balance covers it; otherwise leave it unchanged.
    pub fn try_debit(&mut self, amount: u64) -> bool {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_within_balance() {
        let mut fees = FeeAccount::new();
        fees.credit(10).unwrap();
        assert!(fees.try_debit(4));
        assert!(fees.try_debit(6));
        assert_eq!(fees.balance(), 0);
    }

    #[test]
    fn overdraw_leaves_balance_unchanged() {
        let mut fees = FeeAccount::new();
        fees.credit(3).unwrap();
        assert!(!fees.try_debit(4));
        assert_eq!(fees.balance(), 3);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut fees = FeeAccount::new();
        fees.credit(u64::MAX).unwrap();
        assert_eq!(fees.credit(1), Err(AtlaError::CounterOverflow));
        assert_eq!(fees.balance(), u64::MAX);
    }
}
