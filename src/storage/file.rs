// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{IsPersistent, Storage};

/// JSON document at a fixed path. Parent directories are created on first
/// write.
pub(crate) struct File {
    path: PathBuf,
}

impl File {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: Send + Serialize + Sync + for<'de> Deserialize<'de>> Storage<T> for File {
    async fn get(&mut self) -> Result<Option<T>> {
        match fs::File::open(&self.path) {
            Ok(fp) => Ok(Some(serde_json::from_reader::<fs::File, T>(fp)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, data)?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Result;

    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut storage = File::new(dir.path().join("absent.json"));
        let data: Option<Vec<String>> = storage.get().await?;
        assert!(data.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_creates_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut storage = File::new(dir.path().join("nested/keys.json"));
        storage.update(&vec!["a".to_owned(), "b".to_owned()]).await?;

        assert!(storage.path().exists());
        let data: Option<Vec<String>> = storage.get().await?;
        assert_eq!(data, Some(vec!["a".to_owned(), "b".to_owned()]));
        Ok(())
    }

    #[tokio::test]
    async fn clear_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut storage = File::new(dir.path().join("keys.json"));
        Storage::<Vec<u8>>::update(&mut storage, &vec![1, 2, 3]).await?;
        Storage::<Vec<u8>>::clear(&mut storage).await?;
        Storage::<Vec<u8>>::clear(&mut storage).await?;
        assert!(!storage.path().exists());
        Ok(())
    }
}
