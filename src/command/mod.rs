// SPDX-FileCopyrightText: 2022 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::{connection::Settings, error::Result};

pub(crate) mod keygen;
pub(crate) mod menu;
pub(crate) mod run;

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, settings: &Settings) -> Result<()>;
}
