// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::error::Result;

use super::{IsPersistent, Storage};

/// Holds the key set for the lifetime of the process only. Used when the user
/// asks to see freshly generated keys without writing anything to disk.
pub(crate) struct Memory<T> {
    data: Option<T>,
}

impl<T> Memory<T> {
    pub(crate) const fn new() -> Self {
        Self { data: None }
    }
}

impl<T> IsPersistent for Memory<T> {
    fn is_persistent(&self) -> bool {
        false
    }
}

#[async_trait]
impl<T: Send + Sync + Clone> Storage<T> for Memory<T> {
    async fn get(&mut self) -> Result<Option<T>> {
        Ok(self.data.clone())
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        self.data = Some(data.clone());
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.data = None;
        Ok(())
    }
}

impl<T> Default for Memory<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Result;

    use super::*;

    #[tokio::test]
    async fn holds_latest_value_until_cleared() -> Result<()> {
        let mut storage = Memory::new();
        assert!(!storage.is_persistent());
        assert_eq!(storage.get().await?, None::<u32>);

        storage.update(&1).await?;
        storage.update(&2).await?;
        assert_eq!(storage.get().await?, Some(2));

        storage.clear().await?;
        assert_eq!(storage.get().await?, None);
        Ok(())
    }
}
