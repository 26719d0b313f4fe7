//! File-backed storage adapter.
//!
//! Implements [`StoragePort`] with one file per key:
//! `<root>/<namespace>/<key>.json`.
//!
//! # Atomicity
//!
//! A write goes to a sibling temp file, is fsync'd, then renamed over the
//! target.  `rename` within one directory is atomic on POSIX filesystems,
//! so a reader (or a restart after a crash) sees either the old bytes or
//! the new ones.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use log::{debug, info};

use crate::app::ports::{StorageError, StoragePort};

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) the storage root directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("FileStorage: using {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.json"))
    }
}

impl StoragePort for FileStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(namespace, key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.path_for(namespace, key);
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)?;

        let tmp = dir.join(format!(".{key}.json.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        debug!("FileStorage: wrote {} bytes to {}", data.len(), target.display());
        Ok(())
    }
}
