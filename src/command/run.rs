// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::info;

use crate::{
    connection::Settings,
    demo::DemoKind,
    error::{Error, Result},
};

/// Run demos without the interactive menu. The matching servers must already
/// be running.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The demos to run, in order.
    #[arg(required = true, value_enum)]
    demos: Vec<DemoKind>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, settings: &Settings) -> Result<()> {
        let mut failures = 0;
        for demo in self.demos {
            if let Some(config) = demo.server_config(settings) {
                info!("{} expects nats-server -c {}", demo.title(), config.display());
            }
            let report = demo.run(settings).await?;
            println!("\n{}", report.summary());
            println!(
                "{}: {} of {} checks behaved as expected",
                report.title(),
                report.checks().len() - report.failures(),
                report.checks().len()
            );
            failures += report.failures();
        }

        if failures > 0 {
            return Err(Error::ChecksFailed(failures));
        }
        Ok(())
    }
}
