//! On-disk storage of the simulated application.
//!
//! Every set-up gets its own directory tree. Without an explicit root the tree lives in a
//! temporary directory that is deleted once the [`AppStorage`] is dropped.
//!
//! ```text
//! <root>/
//! ├── <package>-sourceDir/
//! ├── <package>-publicSourceDir/
//! ├── <package>-dataDir/
//! ├── userDataDir/          (API 24+)
//! └── deviceDataDir/        (API 24+)
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::{config::API_N, Result};

/// The application's storage directories.
#[derive(Debug)]
pub struct AppStorage {
    root: PathBuf,
    source_dir: PathBuf,
    public_source_dir: PathBuf,
    data_dir: PathBuf,
    credential_protected_data_dir: Option<PathBuf>,
    device_protected_data_dir: Option<PathBuf>,
    // Held so the temporary tree lives as long as the storage.
    _temp: Option<TempDir>,
}

impl AppStorage {
    /// Creates the directory tree for `package_name` on `api_level`.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory to create the tree under; `None` for a fresh temporary directory
    /// * `package_name` - Package the directories are named after
    /// * `api_level` - Credential and device protected directories exist from API 24 on
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if a directory cannot be created.
    pub fn create(root: Option<&Path>, package_name: &str, api_level: u32) -> Result<Self> {
        let (root, temp) = match root {
            Some(root) => (root.to_path_buf(), None),
            None => {
                let temp = tempfile::Builder::new().prefix("shadowhost-").tempdir()?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };

        let source_dir = create_dir(&root, &format!("{package_name}-sourceDir"))?;
        let public_source_dir = create_dir(&root, &format!("{package_name}-publicSourceDir"))?;
        let data_dir = create_dir(&root, &format!("{package_name}-dataDir"))?;
        let (credential_protected_data_dir, device_protected_data_dir) = if api_level >= API_N {
            (
                Some(create_dir(&root, "userDataDir")?),
                Some(create_dir(&root, "deviceDataDir")?),
            )
        } else {
            (None, None)
        };

        log::debug!("application storage for {package_name} at {}", root.display());

        Ok(Self {
            root,
            source_dir,
            public_source_dir,
            data_dir,
            credential_protected_data_dir,
            device_protected_data_dir,
            _temp: temp,
        })
    }

    /// Root of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Code directory.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Publicly readable code directory.
    #[must_use]
    pub fn public_source_dir(&self) -> &Path {
        &self.public_source_dir
    }

    /// Private data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Credential-protected data directory, if the API level has one.
    #[must_use]
    pub fn credential_protected_data_dir(&self) -> Option<&Path> {
        self.credential_protected_data_dir.as_deref()
    }

    /// Device-protected data directory, if the API level has one.
    #[must_use]
    pub fn device_protected_data_dir(&self) -> Option<&Path> {
        self.device_protected_data_dir.as_deref()
    }

    /// Returns `true` if the tree is removed on drop.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self._temp.is_some()
    }
}

fn create_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let path = root.join(name);
    fs::create_dir_all(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_directories_exist() {
        let storage = AppStorage::create(None, "com.example", 28).unwrap();
        assert!(storage.source_dir().is_dir());
        assert!(storage.public_source_dir().is_dir());
        assert!(storage.data_dir().is_dir());
        assert!(storage.credential_protected_data_dir().unwrap().is_dir());
        assert!(storage.device_protected_data_dir().unwrap().is_dir());
        assert!(storage.is_temporary());
    }

    #[test]
    fn test_no_protected_dirs_before_n() {
        let storage = AppStorage::create(None, "com.example", 23).unwrap();
        assert!(storage.credential_protected_data_dir().is_none());
        assert!(storage.device_protected_data_dir().is_none());
    }

    #[test]
    fn test_temporary_tree_removed_on_drop() {
        let storage = AppStorage::create(None, "com.example", 28).unwrap();
        let root = storage.root().to_path_buf();
        drop(storage);
        assert!(!root.exists());
    }

    #[test]
    fn test_explicit_root_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AppStorage::create(Some(dir.path()), "com.example", 28).unwrap();
        assert!(!storage.is_temporary());
        assert!(storage.data_dir().starts_with(dir.path()));
        drop(storage);
        assert!(dir.path().join("com.example-dataDir").is_dir());
    }

    #[test]
    fn test_unwritable_root_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, b"x").unwrap();

        let err = AppStorage::create(Some(&file), "com.example", 28).unwrap_err();
        assert!(matches!(err, Error::FileError(_)));
    }
}
