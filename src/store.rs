use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persisted record for one processed match. Nothing is ever deleted.
pub trait ResultStore {
    fn exists(&self, match_id: &str) -> bool;

    /// Atomically create an empty record. `false` when it already exists.
    fn claim(&self, match_id: &str) -> Result<bool>;

    /// Drop a claim that never got its record.
    fn release(&self, match_id: &str) -> Result<()>;

    /// Write (or overwrite) the full record.
    fn write<T: Serialize>(&self, match_id: &str, record: &T) -> Result<()>;
}

/// `hawk.<match_id>.json` soubory v jednom adresáři
///
/// Prázdný soubor, který nezaložil tento proces, je claim po spadlém běhu.
/// Běh je chráněný single-instance lockem, takže se smí převzít.
pub struct FileResultStore {
    dir:     PathBuf,
    claimed: Mutex<HashSet<String>>,
}

impl FileResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
        Ok(Self { dir, claimed: Mutex::new(HashSet::new()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, match_id: &str) -> PathBuf {
        self.dir.join(format!("hawk.{}.json", file_safe(match_id)))
    }
}

/// Match id jde do názvu souboru, povolíme jen bezpečné znaky.
fn file_safe(match_id: &str) -> String {
    match_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

impl ResultStore for FileResultStore {
    fn exists(&self, match_id: &str) -> bool {
        self.path_for(match_id).exists()
    }

    fn claim(&self, match_id: &str) -> Result<bool> {
        let path = self.path_for(match_id);
        let mut claimed = self.claimed.lock().map_err(|_| anyhow!("claim set poisoned"))?;
        let fresh = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let empty = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(false);
                if empty && !claimed.contains(match_id) {
                    tracing::warn!("♻️  Stale claim {} taken over", path.display());
                    true
                } else {
                    false
                }
            }
            Err(e) => return Err(e).with_context(|| format!("cannot claim {}", path.display())),
        };
        if fresh {
            claimed.insert(match_id.to_string());
        }
        Ok(fresh)
    }

    fn release(&self, match_id: &str) -> Result<()> {
        let path = self.path_for(match_id);
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.remove(match_id);
        }
        match fs::metadata(&path) {
            Ok(m) if m.len() == 0 => {
                fs::remove_file(&path).with_context(|| format!("cannot release {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn write<T: Serialize>(&self, match_id: &str, record: &T) -> Result<()> {
        let path = self.path_for(match_id);
        let json = serde_json::to_string(record)?;
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        f.write_all(json.as_bytes())?;
        Ok(())
    }
}
