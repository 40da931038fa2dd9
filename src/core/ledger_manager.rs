use std::path::PathBuf;

use crate::core::services::{BalanceService, Balances, SettlementPlan, SettlementService};
use crate::errors::LedgerError;
use crate::ledger::{DateWindow, Ledger};
use crate::storage::{LoadOrigin, StorageBackend};

/// Metadata describing the outcome of a load operation.
#[derive(Debug, Clone)]
pub struct LoadMetadata {
    pub origin: LoadOrigin,
    pub warnings: Vec<String>,
    pub path: PathBuf,
    pub name: String,
}

/// Facade that coordinates the open ledger, persistence, and backups.
pub struct LedgerManager {
    current: Option<Ledger>,
    current_name: Option<String>,
    storage: Box<dyn StorageBackend>,
}

impl LedgerManager {
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            current: None,
            current_name: None,
            storage,
        }
    }

    pub fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    pub fn load(&mut self, name: &str) -> Result<LoadMetadata, LedgerError> {
        let report = self.storage.load(name)?;
        self.current = Some(report.ledger);
        self.current_name = Some(name.to_string());
        Ok(LoadMetadata {
            origin: report.origin,
            warnings: report.warnings,
            path: report.path,
            name: name.to_string(),
        })
    }

    pub fn save(&self) -> Result<PathBuf, LedgerError> {
        let name = self.require_name()?;
        self.storage.save(self.require_current()?, name)
    }

    pub fn save_as(&mut self, name: &str) -> Result<PathBuf, LedgerError> {
        let path = self.storage.save(self.require_current()?, name)?;
        self.current_name = Some(name.to_string());
        Ok(path)
    }

    pub fn backup(&self, note: Option<&str>) -> Result<PathBuf, LedgerError> {
        let name = self.require_name()?;
        self.storage.backup(self.require_current()?, name, note)
    }

    pub fn list_backups(&self) -> Result<Vec<String>, LedgerError> {
        self.storage.list_backups(self.require_name()?)
    }

    /// Replaces the open ledger with the contents of a backup.
    pub fn restore(&mut self, backup_name: &str) -> Result<(), LedgerError> {
        let name = self.require_name()?.to_string();
        let ledger = self.storage.restore(&name, backup_name)?;
        self.current = Some(ledger);
        Ok(())
    }

    pub fn current(&self) -> Option<&Ledger> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Ledger> {
        self.current.as_mut()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn set_current(&mut self, ledger: Ledger, name: Option<String>) {
        self.current = Some(ledger);
        self.current_name = name;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.current_name = None;
    }

    pub fn balances(&self, window: DateWindow) -> Result<Balances, LedgerError> {
        Ok(BalanceService::compute_balances(self.require_current()?, window))
    }

    pub fn settle(&self, window: DateWindow) -> Result<SettlementPlan, LedgerError> {
        Ok(SettlementService::plan(&self.balances(window)?))
    }

    fn require_current(&self) -> Result<&Ledger, LedgerError> {
        self.current
            .as_ref()
            .ok_or_else(|| LedgerError::Persistence("no ledger loaded".into()))
    }

    fn require_name(&self) -> Result<&str, LedgerError> {
        self.current_name
            .as_deref()
            .ok_or_else(|| LedgerError::Persistence("current ledger is unnamed".into()))
    }
}
