// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, BufRead as _, Write as _};

use async_trait::async_trait;
use tokio::task;

use crate::error::Result;

/// A source of operator input for the interactive menu.
#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    /// Shows `message` and returns the next line of input with surrounding
    /// whitespace removed, or `None` once input is exhausted.
    async fn prompt(&self, message: &str) -> Result<Option<String>>;

    async fn pause(&self, message: &str) -> Result<bool> {
        Ok(self.prompt(message).await?.is_some())
    }
}

pub(crate) struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn prompt(&self, message: &str) -> Result<Option<String>> {
        let message = message.to_owned();
        Ok(task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{message}")?;
            stdout.flush()?;

            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line)? {
                0 => Ok(None),
                _ => Ok(Some(line.trim().to_owned())),
            }
        })
        .await??)
    }
}

pub(crate) fn rule() -> String {
    "=".repeat(64)
}
