use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{line_item::LineItem, purchase::Purchase, window::DateWindow};
use crate::errors::{AffectedPurchase, ConsistencyWarning, LedgerError, ValidationError};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Household ledger: the participant roster and every recorded purchase.
///
/// Purchases keep their entry order, which is not necessarily date order. All
/// mutation goes through methods that uphold the roster and total invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    participants: Vec<String>,
    #[serde(default)]
    purchases: Vec<Purchase>,
    updated_at: DateTime<Utc>,
    #[serde(default = "Ledger::schema_version_default")]
    schema_version: u8,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            participants: Vec::new(),
            purchases: Vec::new(),
            updated_at: Utc::now(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Empty ledger seeded with a roster; duplicate names collapse into one entry.
    pub fn with_participants<I, S>(names: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ledger = Self::new();
        for name in names {
            ledger.add_participant(name.as_ref())?;
        }
        Ok(ledger)
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.is_rostered(name.trim())
    }

    /// Adds `name` to the roster. Returns `false` when it was already present.
    pub fn add_participant(&mut self, name: &str) -> Result<bool, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.has_participant(name) {
            return Ok(false);
        }
        self.participants.push(name.to_string());
        self.touch();
        tracing::debug!(participant = name, "participant added");
        Ok(true)
    }

    /// Removes `name` from the roster and from every split map.
    ///
    /// Purchases left with splits that no longer sum to 1, or whose buyer was the
    /// removed participant, are reported in the returned warning. They are not
    /// rebalanced.
    pub fn remove_participant(
        &mut self,
        name: &str,
    ) -> Result<Option<ConsistencyWarning>, LedgerError> {
        let name = name.trim();
        let position = self
            .participants
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| LedgerError::NotFound(format!("participant `{}`", name)))?;
        self.participants.remove(position);

        let mut affected = Vec::new();
        for (index, purchase) in self.purchases.iter_mut().enumerate() {
            let bought_by_removed = purchase.buyer() == name;
            let mut unbalanced_items = Vec::new();
            for item in purchase.items_mut() {
                if item.prune_participant(name) && !item.splits_balanced() {
                    unbalanced_items.push(item.description().to_string());
                }
            }
            if bought_by_removed || !unbalanced_items.is_empty() {
                affected.push(AffectedPurchase {
                    index,
                    id: purchase.id(),
                    date: purchase.date(),
                    store: purchase.store().to_string(),
                    bought_by_removed,
                    unbalanced_items,
                });
            }
        }
        self.touch();

        if affected.is_empty() {
            tracing::debug!(participant = name, "participant removed");
            return Ok(None);
        }
        let warning = ConsistencyWarning {
            participant: name.to_string(),
            affected,
        };
        tracing::warn!(%warning, "participant removal left inconsistent purchases");
        Ok(Some(warning))
    }

    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }

    pub fn purchase_count(&self) -> usize {
        self.purchases.len()
    }

    pub fn purchase(&self, index: usize) -> Result<&Purchase, LedgerError> {
        self.purchases.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.purchases.len(),
        })
    }

    pub fn purchase_by_id(&self, id: Uuid) -> Option<&Purchase> {
        self.purchases.iter().find(|p| p.id() == Some(id))
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.purchases.iter().position(|p| p.id() == Some(id))
    }

    /// Appends a validated purchase and returns its index.
    pub fn add_purchase(&mut self, purchase: Purchase) -> Result<usize, LedgerError> {
        self.check_purchase(&purchase)?;
        self.purchases.push(purchase);
        self.touch();
        let index = self.purchases.len() - 1;
        tracing::debug!(index, "purchase added");
        Ok(index)
    }

    pub fn remove_purchase(&mut self, index: usize) -> Result<Purchase, LedgerError> {
        self.check_index(index)?;
        let removed = self.purchases.remove(index);
        self.touch();
        tracing::debug!(index, store = removed.store(), "purchase removed");
        Ok(removed)
    }

    pub fn remove_purchase_by_id(&mut self, id: Uuid) -> Result<Purchase, LedgerError> {
        let index = self
            .position_of(id)
            .ok_or_else(|| LedgerError::NotFound(format!("purchase {}", id)))?;
        self.remove_purchase(index)
    }

    /// Replaces the whole item list of a purchase. Nothing changes if validation fails.
    pub fn replace_items(&mut self, index: usize, items: Vec<LineItem>) -> Result<(), LedgerError> {
        self.check_index(index)?;
        for item in &items {
            self.check_splits(item)?;
        }
        self.purchases[index].replace_items(items)?;
        self.touch();
        tracing::debug!(index, "purchase items replaced");
        Ok(())
    }

    /// Replaces a purchase wholesale, keeping the stored id when the new one has none.
    pub fn update_purchase(
        &mut self,
        index: usize,
        mut purchase: Purchase,
    ) -> Result<(), LedgerError> {
        self.check_index(index)?;
        self.check_purchase(&purchase)?;
        if purchase.id().is_none() {
            purchase.set_id(self.purchases[index].id());
        }
        self.purchases[index] = purchase;
        self.touch();
        tracing::debug!(index, "purchase updated");
        Ok(())
    }

    /// Records the identifier a remote store assigned to the purchase at `index`.
    pub fn assign_id(&mut self, index: usize, id: Uuid) -> Result<(), LedgerError> {
        self.check_index(index)?;
        self.purchases[index].set_id(Some(id));
        self.touch();
        Ok(())
    }

    pub fn purchases_in(&self, window: DateWindow) -> impl Iterator<Item = &Purchase> {
        self.purchases
            .iter()
            .filter(move |purchase| window.contains(purchase.date()))
    }

    /// Smallest window covering every purchase date.
    pub fn date_span(&self) -> Option<DateWindow> {
        let start = self.purchases.iter().map(Purchase::date).min()?;
        let end = self.purchases.iter().map(Purchase::date).max()?;
        Some(DateWindow { start, end })
    }

    /// Fails on the first item whose amounts are outside the supported range.
    /// Stored files bypass the constructors, so loaders call this before any arithmetic.
    pub fn check_amounts(&self) -> Result<(), ValidationError> {
        self.purchases
            .iter()
            .flat_map(|purchase| purchase.items())
            .try_for_each(LineItem::check_bounds)
    }

    /// Describes stored purchases that would not pass validation today.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (index, purchase) in self.purchases.iter().enumerate() {
            if !self.is_rostered(purchase.buyer()) {
                warnings.push(format!(
                    "purchase #{} ({} at {}) was bought by `{}`, who is not a participant",
                    index,
                    purchase.date(),
                    purchase.store(),
                    purchase.buyer()
                ));
            }
            for item in purchase.items() {
                if !item.splits_balanced() {
                    warnings.push(format!(
                        "purchase #{} item `{}` splits sum to {}",
                        index,
                        item.description(),
                        item.split_sum()
                    ));
                }
                for name in item.splits().keys() {
                    if !self.is_rostered(name) {
                        warnings.push(format!(
                            "purchase #{} item `{}` is split with unknown participant `{}`",
                            index,
                            item.description(),
                            name
                        ));
                    }
                }
            }
            if let Err(err) = purchase.validate() {
                if matches!(err, ValidationError::TotalMismatch { .. }) {
                    warnings.push(format!("purchase #{}: {}", index, err));
                }
            }
        }
        warnings
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn schema_version(&self) -> u8 {
        self.schema_version
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    fn check_index(&self, index: usize) -> Result<(), LedgerError> {
        if index >= self.purchases.len() {
            return Err(LedgerError::IndexOutOfRange {
                index,
                len: self.purchases.len(),
            });
        }
        Ok(())
    }

    fn check_purchase(&self, purchase: &Purchase) -> Result<(), LedgerError> {
        purchase.validate()?;
        match purchase.participants().find(|name| !self.is_rostered(name)) {
            Some(unknown) => Err(ValidationError::UnknownParticipant(unknown.to_string()).into()),
            None => Ok(()),
        }
    }

    fn check_splits(&self, item: &LineItem) -> Result<(), ValidationError> {
        match item.splits().keys().find(|name| !self.is_rostered(name)) {
            Some(unknown) => Err(ValidationError::UnknownParticipant(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Exact roster lookup for stored names, which are never re-trimmed.
    fn is_rostered(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }
}
