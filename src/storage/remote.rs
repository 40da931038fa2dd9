//! Purchase-level CRUD against a remote store keyed by opaque ids.

use uuid::Uuid;

use super::Result;
use crate::{errors::LedgerError, ledger::Ledger, ledger::Purchase};

/// Create/read/update/delete of individual purchases.
///
/// Implementations assign an id on the first successful `create`; the ledger keeps
/// it on the purchase so later syncs become updates.
pub trait PurchaseRepository {
    fn list(&self) -> Result<Vec<Purchase>>;
    fn get(&self, id: Uuid) -> Result<Purchase>;
    fn create(&mut self, purchase: &Purchase) -> Result<Uuid>;
    fn update(&mut self, id: Uuid, purchase: &Purchase) -> Result<()>;
    fn delete(&mut self, id: Uuid) -> Result<()>;
}

/// Local stand-in for the REST service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchaseRepository {
    records: Vec<Purchase>,
}

impl InMemoryPurchaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.records
            .iter()
            .position(|p| p.id() == Some(id))
            .ok_or_else(|| LedgerError::NotFound(format!("purchase {}", id)))
    }
}

impl PurchaseRepository for InMemoryPurchaseRepository {
    fn list(&self) -> Result<Vec<Purchase>> {
        Ok(self.records.clone())
    }

    fn get(&self, id: Uuid) -> Result<Purchase> {
        let index = self.position(id)?;
        Ok(self.records[index].clone())
    }

    fn create(&mut self, purchase: &Purchase) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.records.push(purchase.clone().with_id(id));
        Ok(id)
    }

    fn update(&mut self, id: Uuid, purchase: &Purchase) -> Result<()> {
        let index = self.position(id)?;
        self.records[index] = purchase.clone().with_id(id);
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> Result<()> {
        let index = self.position(id)?;
        self.records.remove(index);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
}

/// Pushes every purchase: new ones are created and get their id recorded in the
/// ledger, the rest are updated in place. Stops at the first failure.
pub fn sync_purchases(
    ledger: &mut Ledger,
    repository: &mut dyn PurchaseRepository,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for index in 0..ledger.purchase_count() {
        let purchase = ledger.purchase(index)?.clone();
        match purchase.id() {
            Some(id) => {
                repository.update(id, &purchase)?;
                report.updated += 1;
            }
            None => {
                let id = repository.create(&purchase)?;
                ledger.assign_id(index, id)?;
                report.created += 1;
            }
        }
    }
    tracing::info!(created = report.created, updated = report.updated, "purchases synced");
    Ok(report)
}
