//! Account ledger (kata book).
//!
//! Append-only per-(wholesaler, retailer) entries. A DEBIT records an
//! obligation (order accepted), a CREDIT records a confirmed payment.
//! Entries are never updated or deleted; the outstanding balance is
//! always recomputed from the full history.

use chrono::{DateTime, Utc};
use common::{LedgerEntryId, Money, RetailerId, WholesalerId};
use serde::{Deserialize, Serialize};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Increases what the retailer owes.
    Debit,
    /// Decreases what the retailer owes.
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(EntryType::Debit),
            "CREDIT" => Ok(EntryType::Credit),
            other => Err(format!("unknown ledger entry type: {other}")),
        }
    }
}

/// One immutable line of the kata book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub wholesaler_id: WholesalerId,
    pub retailer_id: RetailerId,
    pub entry_type: EntryType,
    pub amount: Money,
    pub description: String,
    pub entry_date: DateTime<Utc>,
}

impl LedgerEntry {
    /// Records an obligation against the retailer.
    pub fn debit(
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
        amount: Money,
        description: impl Into<String>,
        entry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            wholesaler_id,
            retailer_id,
            entry_type: EntryType::Debit,
            amount,
            description: description.into(),
            entry_date,
        }
    }

    /// Records a confirmed payment by the retailer.
    pub fn credit(
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
        amount: Money,
        description: impl Into<String>,
        entry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            wholesaler_id,
            retailer_id,
            entry_type: EntryType::Credit,
            amount,
            description: description.into(),
            entry_date,
        }
    }
}

/// Net amount the retailer still owes: `Σ(DEBIT) − Σ(CREDIT)`.
pub fn outstanding<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Money {
    entries
        .into_iter()
        .fold(Money::zero(), |acc, e| match e.entry_type {
            EntryType::Debit => acc + e.amount,
            EntryType::Credit => acc - e.amount,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_nets_debits_against_credits() {
        let w = WholesalerId::new();
        let r = RetailerId::new();
        let now = Utc::now();
        let entries = vec![
            LedgerEntry::debit(w, r, Money::from_rupees(365), "Order accepted", now),
            LedgerEntry::credit(w, r, Money::from_rupees(200), "Payment confirmed", now),
            LedgerEntry::credit(w, r, Money::from_rupees(165), "Payment confirmed", now),
        ];
        assert_eq!(outstanding(&entries), Money::zero());
    }

    #[test]
    fn outstanding_of_empty_history_is_zero() {
        assert_eq!(outstanding(&[]), Money::zero());
    }

    #[test]
    fn overpayment_shows_as_negative_outstanding() {
        let w = WholesalerId::new();
        let r = RetailerId::new();
        let now = Utc::now();
        let entries = vec![LedgerEntry::credit(
            w,
            r,
            Money::from_rupees(100),
            "Payment confirmed",
            now,
        )];
        assert_eq!(outstanding(&entries), Money::from_rupees(-100));
    }
}
