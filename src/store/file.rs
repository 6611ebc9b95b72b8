//! JSON file backend with atomic writes.
//!
//! Stores each collection in its own file under a data directory.
//! Uses temp file + rename for atomic writes, and one mutex per file so
//! read-modify-write cycles on a collection never interleave.
//!
//! List entries that do not match the record schema (hand edits, older
//! formats) are carried through rewrites verbatim. A file that does not
//! parse at all is moved aside before a write replaces it.

use crate::store::records::{BlockList, KeyTable, VisitLog, VisitRecord};
use crate::store::RecordStore;
use crate::GateError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File holding the key table.
pub const KEY_FILE: &str = "key.json";

/// File holding the blocked IP list.
pub const IP_FILE: &str = "m7ip.json";

/// File holding the visit log.
pub const VISIT_FILE: &str = "infom7.json";

/// Suffix for a collection file moved aside because it did not parse.
pub const CORRUPT_SUFFIX: &str = "corrupt";

/// A list entry as found on disk.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Record(T),
    Foreign(serde_json::Value),
}

impl<T> Entry<T> {
    fn record(&self) -> Option<&T> {
        match self {
            Entry::Record(record) => Some(record),
            Entry::Foreign(_) => None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredBlockList {
    #[serde(default)]
    blocked_ips: Vec<Entry<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredVisitLog {
    #[serde(default)]
    visits: Vec<Entry<VisitRecord>>,
}

/// File-based record store.
pub struct FileStore {
    dir: PathBuf,
    keys_lock: Mutex<()>,
    ips_lock: Mutex<()>,
    visits_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `dir`.
    ///
    /// Creates the directory and writes an empty default for every missing
    /// collection file. Existing files are left untouched, even if corrupt.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| GateError::StoreIO(format!("Failed to create data dir: {}", e)))?;

        let store = Self {
            dir,
            keys_lock: Mutex::new(()),
            ips_lock: Mutex::new(()),
            visits_lock: Mutex::new(()),
        };

        store.ensure_file(KEY_FILE, &KeyTable::default())?;
        store.ensure_file(IP_FILE, &BlockList::default())?;
        store.ensure_file(VISIT_FILE, &VisitLog::default())?;

        tracing::debug!(dir = %store.dir.display(), "record store opened");
        Ok(store)
    }

    /// Data directory backing this store.
    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn ensure_file<T: Serialize>(&self, name: &str, empty: &T) -> Result<(), GateError> {
        let path = self.path(name);
        if path.exists() {
            return Ok(());
        }
        write_json(&path, empty)
    }

    /// Read-only load: anything unreadable is the empty default.
    fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match read_json(&self.path(name)) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(file = name, error = %e, "unreadable collection, using empty default");
                T::default()
            }
        }
    }

    /// Load ahead of a rewrite. An unparseable file is moved aside first so
    /// the rewrite cannot destroy it.
    fn load_for_append<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, GateError> {
        let path = self.path(name);
        match read_json(&path) {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(e) => {
                let aside = set_aside(&path)?;
                tracing::error!(
                    file = name,
                    moved_to = %aside.display(),
                    error = %e,
                    "unparseable collection moved aside"
                );
                Ok(T::default())
            }
        }
    }
}

/// Acquire a collection lock, recovering from poisoning.
///
/// The guarded data lives on disk, so a panic mid-write leaves nothing
/// inconsistent in memory.
fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read a collection file. `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, GateError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GateError::StoreIO(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| GateError::StoreIO(format!("Failed to parse {}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GateError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GateError::StoreIO(format!("Failed to serialize: {}", e)))?;

    // Atomic write via temp + rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &json)
        .map_err(|e| GateError::StoreIO(format!("Failed to write temp file: {}", e)))?;
    fs::rename(&temp_path, path)
        .map_err(|e| GateError::StoreIO(format!("Failed to rename {}: {}", path.display(), e)))?;

    Ok(())
}

/// Move `path` to a fresh `<name>.corrupt[.N]` sibling and return it.
fn set_aside(path: &Path) -> Result<PathBuf, GateError> {
    let base = format!("{}.{}", path.display(), CORRUPT_SUFFIX);
    let mut aside = PathBuf::from(&base);
    let mut n = 1;
    while aside.exists() {
        aside = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }
    fs::rename(path, &aside)
        .map_err(|e| GateError::StoreIO(format!("Failed to move {} aside: {}", path.display(), e)))?;
    Ok(aside)
}

impl RecordStore for FileStore {
    fn load_keys(&self) -> KeyTable {
        let _guard = lock(&self.keys_lock);
        self.load_or_default(KEY_FILE)
    }

    fn save_keys(&self, table: &KeyTable) -> Result<(), GateError> {
        let _guard = lock(&self.keys_lock);
        write_json(&self.path(KEY_FILE), table)
    }

    fn update_keys(
        &self,
        apply: &mut dyn FnMut(&mut KeyTable) -> bool,
    ) -> Result<bool, GateError> {
        let _guard = lock(&self.keys_lock);
        // A key file that does not parse is left for the operator to repair.
        let mut table: KeyTable = read_json(&self.path(KEY_FILE))?.unwrap_or_default();
        let changed = apply(&mut table);
        if changed {
            write_json(&self.path(KEY_FILE), &table)?;
        }
        Ok(changed)
    }

    fn is_blocked(&self, ip: &str) -> bool {
        let _guard = lock(&self.ips_lock);
        let list: StoredBlockList = self.load_or_default(IP_FILE);
        list.blocked_ips
            .iter()
            .any(|entry| entry.record().is_some_and(|blocked| blocked == ip))
    }

    fn block_ip(&self, ip: &str) -> Result<(), GateError> {
        let _guard = lock(&self.ips_lock);
        let mut list: StoredBlockList = self.load_for_append(IP_FILE)?;
        if list
            .blocked_ips
            .iter()
            .any(|entry| entry.record().is_some_and(|blocked| blocked == ip))
        {
            return Ok(());
        }
        list.blocked_ips.push(Entry::Record(ip.to_string()));
        write_json(&self.path(IP_FILE), &list)
    }

    fn blocked_ips(&self) -> Vec<String> {
        let _guard = lock(&self.ips_lock);
        self.load_or_default::<StoredBlockList>(IP_FILE)
            .blocked_ips
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Record(ip) => Some(ip),
                Entry::Foreign(_) => None,
            })
            .collect()
    }

    fn append_visit(&self, visit: VisitRecord) -> Result<(), GateError> {
        let _guard = lock(&self.visits_lock);
        let mut log: StoredVisitLog = self.load_for_append(VISIT_FILE)?;
        log.visits.push(Entry::Record(visit));
        write_json(&self.path(VISIT_FILE), &log)
    }

    fn visits(&self) -> Vec<VisitRecord> {
        let _guard = lock(&self.visits_lock);
        self.load_or_default::<StoredVisitLog>(VISIT_FILE)
            .visits
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Record(visit) => Some(visit),
                Entry::Foreign(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::{DeviceClass, KeyRecord};
    use tempfile::TempDir;

    fn make_visit(ip: &str) -> VisitRecord {
        VisitRecord {
            ip: ip.to_string(),
            country: "Jordan".to_string(),
            vpn: "No".to_string(),
            isp: "Orange".to_string(),
            device: DeviceClass::Phone,
            browser: "Mozilla".to_string(),
            time: "01:02:03 PM".to_string(),
            date: "2025-01-15".to_string(),
        }
    }

    #[test]
    fn test_open_creates_default_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("data")).unwrap();

        for name in [KEY_FILE, IP_FILE, VISIT_FILE] {
            assert!(store.dir().join(name).exists(), "{} missing", name);
        }

        let keys: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.dir().join(KEY_FILE)).unwrap()).unwrap();
        assert_eq!(keys, serde_json::json!({"keys": {}}));
        let ips: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.dir().join(IP_FILE)).unwrap()).unwrap();
        assert_eq!(ips, serde_json::json!({"blocked_ips": []}));
    }

    #[test]
    fn test_open_keeps_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(KEY_FILE),
            r#"{"keys": {"k1": {"active": true}}}"#,
        )
        .unwrap();

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.load_keys().is_active("k1"));
    }

    #[test]
    fn test_corrupt_keys_load_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join(KEY_FILE), "{not json").unwrap();

        assert!(store.load_keys().keys.is_empty());
    }

    #[test]
    fn test_missing_blocklist_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::remove_file(temp_dir.path().join(IP_FILE)).unwrap();

        assert!(!store.is_blocked("1.2.3.4"));
        assert!(store.blocked_ips().is_empty());
    }

    #[test]
    fn test_keys_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let mut table = KeyTable::default();
        table.keys.insert("k1".to_string(), KeyRecord::with_duration(30));
        store.save_keys(&table).unwrap();

        assert_eq!(store.load_keys(), table);
    }

    #[test]
    fn test_update_keys_saves_only_on_change() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let changed = store.update_keys(&mut |_: &mut KeyTable| false).unwrap();
        assert!(!changed);
        assert!(store.load_keys().keys.is_empty());

        let changed = store
            .update_keys(&mut |table: &mut KeyTable| {
                table.keys.insert("k2".to_string(), KeyRecord::active());
                true
            })
            .unwrap();
        assert!(changed);
        assert!(store.load_keys().is_active("k2"));
    }

    #[test]
    fn test_block_ip_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.block_ip("10.0.0.1").unwrap();
        store.block_ip("10.0.0.1").unwrap();
        store.block_ip("10.0.0.2").unwrap();

        assert!(store.is_blocked("10.0.0.1"));
        assert!(!store.is_blocked("10.0.0.3"));
        assert_eq!(store.blocked_ips(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_block_ip_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store.block_ip("10.0.0.9").unwrap();
        }
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.is_blocked("10.0.0.9"));
    }

    #[test]
    fn test_append_visit() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.append_visit(make_visit("1.1.1.1")).unwrap();
        store.append_visit(make_visit("2.2.2.2")).unwrap();

        let visits = store.visits();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].ip, "1.1.1.1");
        assert_eq!(visits[1].ip, "2.2.2.2");
    }

    #[test]
    fn test_append_visit_sets_aside_corrupt_log() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join(VISIT_FILE), "garbage").unwrap();

        store.append_visit(make_visit("3.3.3.3")).unwrap();
        assert_eq!(store.visits().len(), 1);

        let aside = temp_dir.path().join(format!("{}.{}", VISIT_FILE, CORRUPT_SUFFIX));
        assert_eq!(fs::read_to_string(aside).unwrap(), "garbage");
    }

    #[test]
    fn test_append_visit_keeps_legacy_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let valid = serde_json::to_value(make_visit("1.1.1.1")).unwrap();
        let legacy = serde_json::json!({"ip": "2.2.2.2", "time": "10:00:00 AM"});
        fs::write(
            temp_dir.path().join(VISIT_FILE),
            serde_json::json!({"visits": [valid, legacy]}).to_string(),
        )
        .unwrap();

        store.append_visit(make_visit("4.4.4.4")).unwrap();

        let ips: Vec<_> = store.visits().into_iter().map(|v| v.ip).collect();
        assert_eq!(ips, vec!["1.1.1.1", "4.4.4.4"]);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp_dir.path().join(VISIT_FILE)).unwrap())
                .unwrap();
        let visits = raw["visits"].as_array().unwrap();
        assert_eq!(visits.len(), 3);
        assert_eq!(visits[1], legacy);
    }

    #[test]
    fn test_blocklist_with_foreign_entry_keeps_bans() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::write(
            temp_dir.path().join(IP_FILE),
            r#"{"blocked_ips": ["1.1.1.1", "2.2.2.2", null]}"#,
        )
        .unwrap();

        assert!(store.is_blocked("1.1.1.1"));
        store.block_ip("9.9.9.9").unwrap();

        assert!(store.is_blocked("2.2.2.2"));
        assert_eq!(store.blocked_ips(), vec!["1.1.1.1", "2.2.2.2", "9.9.9.9"]);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp_dir.path().join(IP_FILE)).unwrap())
                .unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"blocked_ips": ["1.1.1.1", "2.2.2.2", null, "9.9.9.9"]})
        );
    }

    #[test]
    fn test_block_ip_sets_aside_unparseable_blocklist() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let original = r#"{"blocked_ips": ["1.1.1.1""#;
        fs::write(temp_dir.path().join(IP_FILE), original).unwrap();
        fs::write(
            temp_dir.path().join(format!("{}.{}", IP_FILE, CORRUPT_SUFFIX)),
            "older",
        )
        .unwrap();

        store.block_ip("9.9.9.9").unwrap();
        assert_eq!(store.blocked_ips(), vec!["9.9.9.9"]);

        // An earlier set-aside file is not clobbered.
        let older = temp_dir.path().join(format!("{}.{}", IP_FILE, CORRUPT_SUFFIX));
        assert_eq!(fs::read_to_string(older).unwrap(), "older");
        let aside = temp_dir.path().join(format!("{}.{}.1", IP_FILE, CORRUPT_SUFFIX));
        assert_eq!(fs::read_to_string(aside).unwrap(), original);
    }

    #[test]
    fn test_update_keys_refuses_corrupt_key_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join(KEY_FILE), "{not json").unwrap();

        let result = store.update_keys(&mut |table: &mut KeyTable| {
            table.keys.insert("k".to_string(), KeyRecord::active());
            true
        });
        assert!(matches!(result, Err(GateError::StoreIO(_))));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(KEY_FILE)).unwrap(),
            "{not json"
        );
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.block_ip("10.0.0.1").unwrap();
        store.append_visit(make_visit("1.1.1.1")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
