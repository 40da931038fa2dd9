//! Single-writer, copy-on-read access to a ledger shared between callers.

use std::sync::{Arc, RwLock};

use crate::{errors::LedgerError, ledger::Ledger};

/// Readers take immutable snapshots; writers apply a mutation to a private copy and
/// publish it only when the mutation succeeds.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Arc<Ledger>>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(ledger))),
        }
    }

    /// Current state. Later mutations never show through the returned value.
    pub fn snapshot(&self) -> Result<Arc<Ledger>, LedgerError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| LedgerError::Persistence("ledger lock poisoned".into()))?;
        Ok(Arc::clone(&guard))
    }

    /// Runs `mutator` against a copy of the ledger while holding the write lock.
    /// The copy replaces the shared state only if `mutator` returns `Ok`.
    pub fn mutate<F, R>(&self, mutator: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Ledger) -> Result<R, LedgerError>,
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| LedgerError::Persistence("ledger lock poisoned".into()))?;
        let mut working = Ledger::clone(&guard);
        let outcome = mutator(&mut working)?;
        *guard = Arc::new(working);
        Ok(outcome)
    }
}
