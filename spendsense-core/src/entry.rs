//! Parsed transaction entries: the normalized output of statement parsing.

use serde::{Deserialize, Serialize};

/// One recognized transaction line within a statement.
///
/// `value` is always a non-negative magnitude; whether the money left or
/// entered the account is carried by `is_expense`, never by a negative
/// number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEntry {
    /// Date token as it appeared in the source (ISO or locale format).
    pub date: String,
    /// Non-negative magnitude of the transaction.
    pub value: f64,
    /// True for debits/withdrawals, false for credits/deposits.
    pub is_expense: bool,
    /// Free-text description, whitespace-collapsed.
    pub description: String,
}

impl ParsedEntry {
    /// Build an entry, normalizing the magnitude to a finite non-negative
    /// number.
    pub fn new(
        date: impl Into<String>,
        value: f64,
        is_expense: bool,
        description: impl Into<String>,
    ) -> Self {
        let value = if value.is_finite() { value.abs() } else { 0.0 };
        Self {
            date: date.into(),
            value,
            is_expense,
            description: description.into(),
        }
    }

    /// Signed amount: negative for expenses, positive for income.
    pub fn signed(&self) -> f64 {
        let value = if self.value.is_finite() {
            self.value.abs()
        } else {
            0.0
        };
        if self.is_expense { -value } else { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_magnitude() {
        let e = ParsedEntry::new("2024-01-01", -42.5, true, "Coffee");
        assert_eq!(e.value, 42.5);
        assert_eq!(e.signed(), -42.5);

        let e = ParsedEntry::new("2024-01-01", f64::NAN, false, "junk row");
        assert_eq!(e.value, 0.0);
        assert_eq!(e.signed(), 0.0);
    }

    #[test]
    fn test_signed_follows_expense_flag() {
        let expense = ParsedEntry::new("2024-01-01", 50.0, true, "Coffee");
        let income = ParsedEntry::new("2024-01-02", 1000.0, false, "Payroll");
        assert_eq!(expense.signed(), -50.0);
        assert_eq!(income.signed(), 1000.0);
    }
}
