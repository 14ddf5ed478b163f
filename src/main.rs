// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod command;
mod connection;
mod console;
mod demo;
mod error;
mod keygen;
mod metadata;
mod nkey;
mod report;
mod rng;
mod storage;

use std::{path::PathBuf, process, time::Duration};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use connection::Settings;
use error::Result;
use log::error;

#[derive(Debug, Subcommand)]
enum Command {
    Menu(command::menu::Command),
    Run(command::run::Command),
    Keygen(command::keygen::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, settings: &Settings) -> Result<()> {
        match self {
            Self::Menu(cmd) => cmd.execute(settings).await,
            Self::Run(cmd) => cmd.execute(settings).await,
            Self::Keygen(cmd) => cmd.execute(settings).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The host every demo server listens on.
    #[arg(long, env = "NATS_DEMO_HOST", default_value = "localhost")]
    host: String,

    /// The directory holding the `nats-server` configurations for the demos.
    #[arg(long, env = "NATS_DEMO_CONFIG_DIR", default_value = "config", value_hint = clap::ValueHint::DirPath)]
    config_dir: PathBuf,

    /// Where `keygen` writes generated keys and the NKeys demo reads them.
    #[arg(long, env = "NATS_DEMO_KEY_DIR", default_value = keygen::DEFAULT_KEY_DIR, value_hint = clap::ValueHint::DirPath)]
    key_dir: PathBuf,

    /// How long to wait, in milliseconds, for the server to report a
    /// permission violation after each publish or subscribe.
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,

    /// The connection and request timeout, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    #[clap(subcommand)]
    command: Option<Command>,
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings {
        host: args.host,
        config_dir: args.config_dir,
        key_dir: args.key_dir,
        settle: Duration::from_millis(args.settle_ms),
        timeout: Duration::from_millis(args.timeout_ms),
    };

    let command = args
        .command
        .unwrap_or_else(|| Command::Menu(command::menu::Command));
    command::Command::execute(command, &settings).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("NATS_DEMO_LOG", "warn")
        .write_style("NATS_DEMO_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn menu_is_the_default() {
        let args = Args::parse_from(["nats-auth-demo", "--settle-ms", "50"]);
        assert!(args.command.is_none());
        assert_eq!(args.settle_ms, 50);
    }

    #[test]
    fn run_takes_demo_names() {
        let args = Args::parse_from(["nats-auth-demo", "run", "basic-auth", "nkey-signature"]);
        assert!(matches!(args.command, Some(Command::Run(_))));
        assert!(Args::try_parse_from(["nats-auth-demo", "run"]).is_err());
    }
}
