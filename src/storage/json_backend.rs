use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Deserialize;

use super::{LoadOrigin, LoadReport, Result, StorageBackend};
use crate::{
    config::Config,
    errors::LedgerError,
    ledger::{Ledger, CURRENT_SCHEMA_VERSION},
    utils::paths::{self, ensure_dir, write_atomic},
};

const LEDGER_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for ledgers and their backups.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    ledgers_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
    default_participants: Vec<String>,
}

/// Reads only the version so newer files are rejected before a full parse.
#[derive(Deserialize)]
struct SchemaHeader {
    #[serde(default = "Ledger::schema_version_default")]
    schema_version: u8,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let base = paths::resolve_base(root);
        let ledgers_dir = paths::ledgers_dir_in(&base);
        let backups_dir = paths::backups_dir_in(&base);
        ensure_dir(&ledgers_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            ledgers_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
            default_participants: Vec::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.data_dir.clone(), Some(config.backup_retention))?
            .with_default_participants(config.default_participants.clone()))
    }

    /// Roster given to ledgers that have never been saved.
    pub fn with_default_participants(mut self, names: Vec<String>) -> Self {
        self.default_participants = names;
        self
    }

    pub fn ledger_path(&self, name: &str) -> PathBuf {
        self.ledgers_dir
            .join(format!("{}.{}", canonical_name(name), LEDGER_EXTENSION))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn backup_file_name(name: &str, note: Option<&str>) -> String {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut file_stem = format!("{}_{}", canonical_name(name), timestamp);
        if let Some(label) = sanitize_backup_note(note) {
            file_stem.push('_');
            file_stem.push_str(&label);
        }
        format!("{}.{}", file_stem, LEDGER_EXTENSION)
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let backup_path = dir.join(Self::backup_file_name(name, None));
        fs::copy(path, &backup_path)?;
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            let path = self.backup_path(name, entry);
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }

    fn read_ledger(path: &Path) -> Result<Ledger> {
        let data = fs::read_to_string(path)?;
        Self::parse_ledger(&data)
    }

    fn parse_ledger(data: &str) -> Result<Ledger> {
        let header: SchemaHeader = serde_json::from_str(data)?;
        if header.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(LedgerError::Persistence(format!(
                "ledger schema v{} is newer than supported v{}",
                header.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        let ledger: Ledger = serde_json::from_str(data)?;
        ledger.check_amounts()?;
        Ok(ledger)
    }
}

impl StorageBackend for JsonStorage {
    fn load(&self, name: &str) -> Result<LoadReport> {
        let path = self.ledger_path(name);
        if !path.exists() {
            let ledger = Ledger::with_participants(&self.default_participants)?;
            tracing::info!(path = %path.display(), "no saved ledger, starting fresh");
            return Ok(LoadReport {
                ledger,
                origin: LoadOrigin::Fresh,
                path,
                warnings: Vec::new(),
            });
        }
        let ledger = Self::read_ledger(&path)?;
        let warnings = ledger.consistency_warnings();
        for warning in &warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        tracing::info!(
            path = %path.display(),
            purchases = ledger.purchase_count(),
            "ledger loaded"
        );
        Ok(LoadReport {
            ledger,
            origin: LoadOrigin::Disk,
            path,
            warnings,
        })
    }

    fn save(&self, ledger: &Ledger, name: &str) -> Result<PathBuf> {
        let path = self.ledger_path(name);
        self.backup_existing_file(name, &path)?;
        let json = serde_json::to_string_pretty(ledger)?;
        write_atomic(&path, &json)?;
        tracing::info!(path = %path.display(), "ledger saved");
        Ok(path)
    }

    fn backup(&self, ledger: &Ledger, name: &str, note: Option<&str>) -> Result<PathBuf> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let path = dir.join(Self::backup_file_name(name, note));
        let json = serde_json::to_string_pretty(ledger)?;
        write_atomic(&path, &json)?;
        self.prune_backups(name)?;
        Ok(path)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LEDGER_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(file_name.to_string());
            }
        }
        // Fixed-width timestamps after a shared prefix sort chronologically.
        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries)
    }

    /// Replaces the live file with a backup. The live file is backed up first, so a
    /// restore can itself be undone.
    fn restore(&self, name: &str, backup_name: &str) -> Result<Ledger> {
        if !is_plain_file_name(backup_name) {
            return Err(LedgerError::Persistence(format!(
                "invalid backup name `{}`",
                backup_name
            )));
        }
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(LedgerError::NotFound(format!("backup `{}`", backup_name)));
        }
        // Read before snapshotting: pruning may remove the requested backup.
        let data = fs::read_to_string(&backup_path)?;
        let ledger = Self::parse_ledger(&data)?;
        let target = self.ledger_path(name);
        self.backup_existing_file(name, &target)?;
        write_atomic(&target, &data)?;
        tracing::info!(backup = backup_name, path = %target.display(), "ledger restored");
        Ok(ledger)
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "ledger".into()
    } else {
        sanitized
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use tempfile::TempDir;

    fn storage_with_temp_dir() -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(2))
            .expect("json storage")
            .with_default_participants(vec!["Colby".into(), "Casey".into()]);
        (storage, temp)
    }

    #[test]
    fn first_load_is_fresh_with_default_roster() {
        let (storage, _guard) = storage_with_temp_dir();
        let report = storage.load("house").expect("load");
        assert_eq!(report.origin, LoadOrigin::Fresh);
        assert_eq!(report.ledger.participants(), ["Colby", "Casey"]);
        assert!(report.ledger.purchases().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir();
        let mut ledger = Ledger::new();
        ledger.add_participant("Khanh").unwrap();
        storage.save(&ledger, "House Hold").expect("save");
        let report = storage.load("House Hold").expect("load");
        assert_eq!(report.origin, LoadOrigin::Disk);
        assert_eq!(report.ledger.participants(), ["Khanh"]);
        assert!(report.path.ends_with("house_hold.json"));
    }

    #[test]
    fn corrupt_file_is_not_mistaken_for_first_run() {
        let (storage, _guard) = storage_with_temp_dir();
        fs::write(storage.ledger_path("house"), "{ definitely not json").unwrap();
        let err = storage.load("house").expect_err("corrupt data must surface");
        assert!(matches!(err, LedgerError::Serde(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn backups_are_pruned_to_retention() {
        let (storage, _guard) = storage_with_temp_dir();
        let ledger = Ledger::new();
        for note in ["one", "two", "three"] {
            storage.backup(&ledger, "house", Some(note)).expect("backup");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let backups = storage.list_backups("house").expect("list");
        assert_eq!(backups.len(), 2);
        assert!(backups[0].ends_with("_three.json"), "newest first: {backups:?}");
    }

    #[test]
    fn restore_keeps_the_replaced_file_as_a_backup() {
        let (storage, _guard) = storage_with_temp_dir();
        let mut ledger = Ledger::with_participants(["Colby"]).unwrap();
        storage.save(&ledger, "house").unwrap();
        ledger.add_participant("Casey").unwrap();
        storage.save(&ledger, "house").unwrap();

        let older = storage.list_backups("house").unwrap().remove(0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let restored = storage.restore("house", &older).unwrap();
        assert_eq!(restored.participants(), ["Colby"]);

        let backups = storage.list_backups("house").unwrap();
        assert_eq!(backups.len(), 2);
        let undo = storage.restore("house", &backups[0]).unwrap();
        assert_eq!(undo.participants(), ["Colby", "Casey"]);
    }

    #[test]
    fn restore_rejects_paths_outside_the_backup_dir() {
        let (storage, _guard) = storage_with_temp_dir();
        storage.save(&Ledger::new(), "house").unwrap();
        for name in ["../../ledgers/house.json", "nested/backup.json", "", ".."] {
            let err = storage.restore("house", name).expect_err("path-like backup name");
            assert!(matches!(err, LedgerError::Persistence(_)), "{name}: {err:?}");
        }
        assert!(matches!(
            storage.restore("house", "missing.json"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn oversized_amounts_on_disk_are_rejected() {
        let (storage, _guard) = storage_with_temp_dir();
        let json = r#"{
            "participants": ["A"],
            "purchases": [{
                "buyer": "A",
                "store": "Vault",
                "date": "2024-01-01",
                "declared_total": "79228162514264337593543950335",
                "items": [{
                    "description": "Everything",
                    "pre_tax_cost": "79228162514264337593543950335",
                    "tax_rate": "0.5",
                    "splits": {"A": "1"}
                }]
            }],
            "updated_at": "2024-01-01T00:00:00Z",
            "schema_version": 1
        }"#;
        fs::write(storage.ledger_path("house"), json).unwrap();
        let err = storage.load("house").expect_err("amount would overflow");
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::CostTooLarge(_))
        ));
    }

    #[test]
    fn canonical_names_are_file_safe() {
        assert_eq!(canonical_name("  Our House! "), "our_house_");
        assert_eq!(canonical_name("///"), "ledger");
        assert_eq!(sanitize_backup_note(Some("Month End.")), Some("month-end".into()));
        assert_eq!(sanitize_backup_note(Some("   ")), None);
    }
}
