//! JSON file store implementation

use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{LedgerState, LedgerStore, StoreError, StoreResult};

/// Ledger kept in a single pretty-printed JSON file.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the ledger, so a crash mid-save leaves either the old or the new
/// ledger on disk, never a truncated one.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable ledger aside so the daemon can start empty.
    ///
    /// Returns where the file went, or `None` if there was no file.
    pub fn quarantine(&self) -> StoreResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let stamp = roster_util::now().timestamp();
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", stamp));
        let target = self.path.with_file_name(name);

        std::fs::rename(&self.path, &target)?;
        warn!(
            from = %self.path.display(),
            to = %target.display(),
            "Ledger file quarantined"
        );
        Ok(Some(target))
    }

    fn encode(state: &LedgerState) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        state.serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> StoreResult<LedgerState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No ledger file, starting empty");
                return Ok(LedgerState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let state: LedgerState =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        debug!(
            path = %self.path.display(),
            active = state.active.len(),
            history = state.history.len(),
            "Ledger loaded"
        );
        Ok(state)
    }

    fn save(&self, state: &LedgerState) -> StoreResult<()> {
        let data = Self::encode(state)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            bytes = data.len(),
            "Ledger saved"
        );
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }
}
