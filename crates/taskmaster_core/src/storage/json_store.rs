use crate::error::AppError;
use crate::storage::KeyValueStore;
use std::path::{Path, PathBuf};

const STORE_DIR_ENV_VAR: &str = "TASKMASTER_STORE_DIR";

/// One `<key>.json` file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

pub fn store_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskmaster"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskmaster"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| AppError::io(format!("{}: {}", self.dir.display(), err)))?;

        let path = self.slot_path(key);
        std::fs::write(&path, value)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)?;
        }

        Ok(())
    }
}
