//! Account ledger statements.

use common::{Money, RetailerId, WholesalerId};
use domain::{outstanding, EntryType, LedgerEntry};
use order_store::Store;

use crate::error::Result;

/// Read-side of the account ledger. Entries are written only inside
/// the store's transition and payment-decision units, so this service
/// never mutates anything.
pub struct LedgerService<S> {
    store: S,
}

impl<S: Store> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Full statement for a relationship, most recent first.
    pub async fn statement(
        &self,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.store.ledger_for_pair(wholesaler_id, retailer_id).await?)
    }

    /// Net amount the retailer still owes the wholesaler.
    pub async fn outstanding(
        &self,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
    ) -> Result<Money> {
        let entries = self.store.ledger_for_pair(wholesaler_id, retailer_id).await?;
        Ok(outstanding(&entries))
    }

    /// All of a wholesaler's entries, optionally one entry type.
    pub async fn entries_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .store
            .ledger_for_wholesaler(wholesaler_id, entry_type)
            .await?)
    }

    /// All of a retailer's entries, optionally one entry type.
    pub async fn entries_for_retailer(
        &self,
        retailer_id: RetailerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .store
            .ledger_for_retailer(retailer_id, entry_type)
            .await?)
    }
}
