pub mod json_backend;
pub mod remote;

use std::path::PathBuf;

use crate::{errors::LedgerError, ledger::Ledger};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Abstraction over persistence backends capable of storing ledgers and snapshots.
pub trait StorageBackend: Send + Sync {
    /// Loads the named ledger. A ledger that was never saved comes back empty with
    /// [`LoadOrigin::Fresh`]; unreadable or corrupt data is an error.
    fn load(&self, name: &str) -> Result<LoadReport>;
    fn save(&self, ledger: &Ledger, name: &str) -> Result<PathBuf>;
    fn backup(&self, ledger: &Ledger, name: &str, note: Option<&str>) -> Result<PathBuf>;
    /// Backup file names, newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Ledger>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Nothing was stored yet; the ledger holds only the default roster.
    Fresh,
    /// Read from an existing file.
    Disk,
}

/// Outcome of a load, including non-fatal findings about the stored data.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub ledger: Ledger,
    pub origin: LoadOrigin,
    pub path: PathBuf,
    pub warnings: Vec<String>,
}

pub use json_backend::JsonStorage;
pub use remote::{sync_purchases, InMemoryPurchaseRepository, PurchaseRepository, SyncReport};
