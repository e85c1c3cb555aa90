use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::store::check_id;

/// One pretty-printed JSON file per session in a directory, written with
/// [`Checkpoint::write_to`].
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store in `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &str) -> Result<PathBuf, CheckpointError> {
        check_id(id)?;
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl CheckpointStore for FileStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        checkpoint.write_to(&self.path(&checkpoint.id)?)
    }

    fn load(&self, id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        match Checkpoint::read_from(&self.path(id)?) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(CheckpointError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete(&self, id: &str) -> Result<bool, CheckpointError> {
        let path = self.path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if check_id(id).is_err() {
                continue;
            }
            let modified = fs::metadata(&path)?.modified()?;
            found.push((modified, id.to_string()));
        }
        found.sort();
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Session;
    use crate::config::SessionConfig;
    use crate::ledger::TurnLedger;
    use chess_rules::Position;
    use tempfile::TempDir;

    fn checkpoint() -> Checkpoint {
        Checkpoint::capture(&Session::start(
            TurnLedger::new(Position::starting()),
            SessionConfig::default(),
        ))
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("sessions")).unwrap();
        let cp = checkpoint();

        store.save(&cp).unwrap();
        assert!(store.dir().join(format!("{}.json", cp.id)).exists());
        assert_eq!(store.load(&cp.id).unwrap(), Some(cp.clone()));
        assert_eq!(store.list().unwrap(), vec![cp.id.clone()]);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.load("nothing-here").unwrap(), None);
        assert!(!store.delete("nothing-here").unwrap());
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let cp = checkpoint();
        store.save(&cp).unwrap();
        assert!(store.delete(&cp.id).unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.load("../secret"),
            Err(CheckpointError::InvalidId(_))
        ));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(store.load("broken"), Err(CheckpointError::Json(_))));
    }
}
