// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Write as _;

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    connection::Settings,
    console::{self, Prompt, StdinPrompt},
    demo::DemoKind,
    error::Result,
};

const INNER_WIDTH: usize = 60;

/// Choose demos from an interactive menu. This is the default command.
#[derive(Debug, Default, Parser)]
pub(crate) struct Command;

#[async_trait]
impl super::Command for Command {
    async fn execute(self, settings: &Settings) -> Result<()> {
        run_menu(&StdinPrompt, settings).await
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MenuChoice {
    Demo(DemoKind),
    All,
    Exit,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "0" => Some(Self::Exit),
            "8" => Some(Self::All),
            n => n
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| DemoKind::MENU.get(i))
                .map(|demo| Self::Demo(*demo)),
        }
    }
}

fn boxed_line(out: &mut String, text: &str) {
    _ = writeln!(out, "│{text:<INNER_WIDTH$}│");
}

fn render_menu(settings: &Settings) -> String {
    let border = "─".repeat(INNER_WIDTH);
    let mut out = format!("\n┌{border}┐\n");
    boxed_line(&mut out, " Select a demo to run:");
    _ = writeln!(out, "├{border}┤");
    for (i, demo) in DemoKind::MENU.iter().enumerate() {
        boxed_line(&mut out, &format!("  {}. {}", i + 1, demo.title()));
        for highlight in demo.highlights() {
            boxed_line(&mut out, &format!("     - {highlight}"));
        }
        if let Some(port) = demo.port() {
            boxed_line(&mut out, &format!("     - Server: {}:{port}", settings.host));
        }
        if let Some(config) = demo.server_config(settings) {
            boxed_line(&mut out, &format!("     - Config: {}", config.display()));
        }
        boxed_line(&mut out, "");
    }
    boxed_line(&mut out, &format!("  {}. Run All Demos", DemoKind::MENU.len() + 1));
    boxed_line(&mut out, "");
    boxed_line(&mut out, "  0. Exit");
    _ = write!(out, "└{border}┘");
    out
}

fn banner() -> String {
    let border = "═".repeat(INNER_WIDTH + 2);
    format!(
        "╔{border}╗\n║{:^width$}║\n╚{border}╝",
        "NATS Authorization & Multi-Tenancy Demo",
        width = INNER_WIDTH + 2
    )
}

/// Consecutive menu demos that share one server configuration run as a
/// single stage of "run all".
fn stages(settings: &Settings) -> Vec<(usize, Vec<DemoKind>)> {
    let mut stages: Vec<(usize, Vec<DemoKind>)> = Vec::new();
    for (i, demo) in DemoKind::MENU.into_iter().enumerate() {
        match stages.last_mut() {
            Some((_, demos))
                if demos
                    .last()
                    .is_some_and(|prev| prev.server_config(settings) == demo.server_config(settings)) =>
            {
                demos.push(demo);
            }
            _ => stages.push((i + 1, vec![demo])),
        }
    }
    stages
}

fn stage_title(first: usize, demos: &[DemoKind]) -> String {
    match demos {
        [demo] => format!("Demo {first}: {}", demo.title()),
        _ => format!("Demo {first}-{}: Account Features", first + demos.len() - 1),
    }
}

fn server_command(demo: DemoKind, settings: &Settings) -> String {
    demo.server_config(settings).map_or_else(
        || "no server needed".to_owned(),
        |config| format!("nats-server -c {}", config.display()),
    )
}

async fn run_demo(demo: DemoKind, settings: &Settings) {
    match demo.run(settings).await {
        Ok(report) => println!("\n{}", report.summary()),
        Err(e) => error!("{} did not complete: {e}", demo.title()),
    }
}

/// Returns `false` once input is exhausted.
async fn run_all<P: Prompt + ?Sized>(prompt: &P, settings: &Settings) -> Result<bool> {
    println!("\nThis will run all demos. Make sure you start each NATS server");
    println!("configuration as prompted.");
    if !prompt.pause("\nPress Enter to continue...").await? {
        return Ok(false);
    }

    let rule = console::rule();
    for (first, demos) in stages(settings) {
        println!("\n{rule}\nStarting {}\n{rule}", stage_title(first, &demos));
        if let Some(demo) = demos.first() {
            println!("Start server: {}", server_command(*demo, settings));
        }
        if !prompt.pause("Press Enter when ready...").await? {
            return Ok(false);
        }
        for demo in demos {
            run_demo(demo, settings).await;
        }
    }
    println!("\n{rule}\nAll demos completed!\n{rule}");
    Ok(true)
}

pub(crate) async fn run_menu<P: Prompt + ?Sized>(prompt: &P, settings: &Settings) -> Result<()> {
    println!("{}", banner());
    loop {
        println!("{}", render_menu(settings));
        let Some(input) = prompt.prompt("\nEnter your choice: ").await? else {
            break;
        };

        match MenuChoice::parse(&input) {
            Some(MenuChoice::Exit) => {
                println!("\nExiting... Goodbye!");
                return Ok(());
            }
            Some(MenuChoice::Demo(demo)) => {
                println!("\nMake sure NATS server is running with {}", server_command(demo, settings));
                if !prompt.pause("\nPress Enter to continue...").await? {
                    break;
                }
                run_demo(demo, settings).await;
            }
            Some(MenuChoice::All) => {
                if !run_all(prompt, settings).await? {
                    break;
                }
            }
            None => println!("\nInvalid choice {input:?}. Please try again."),
        }

        if !prompt.pause("\nPress Enter to return to menu...").await? {
            break;
        }
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use crate::{console::tests::ScriptedPrompt, error::Result};

    use super::*;

    fn settings() -> Settings {
        Settings {
            host: "localhost".to_owned(),
            config_dir: PathBuf::from("config"),
            key_dir: PathBuf::from("generated"),
            settle: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn choices_map_to_menu_demos() {
        assert_eq!(MenuChoice::parse("0"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse(" 1 "), Some(MenuChoice::Demo(DemoKind::BasicAuth)));
        assert_eq!(MenuChoice::parse("7"), Some(MenuChoice::Demo(DemoKind::NoAuthUser)));
        assert_eq!(MenuChoice::parse("8"), Some(MenuChoice::All));
        assert_eq!(MenuChoice::parse("9"), None);
        assert_eq!(MenuChoice::parse("basic"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn menu_lists_every_demo_with_its_server() {
        let menu = render_menu(&settings());
        assert!(menu.contains("│  1. Basic Authorization"));
        assert!(menu.contains("- Server: localhost:4225"));
        assert!(menu.contains("- Config: config/accounts.conf"));
        assert!(menu.contains("│  8. Run All Demos"));
        assert!(menu.contains("│  0. Exit"));

        let widths = menu
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().count())
            .collect::<Vec<_>>();
        assert!(widths.iter().all(|w| *w == INNER_WIDTH + 2), "{widths:?}");
    }

    #[test]
    fn account_demos_share_a_stage() {
        let stages = stages(&settings());
        let titles = stages
            .iter()
            .map(|(first, demos)| stage_title(*first, demos))
            .collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec![
                "Demo 1: Basic Authorization",
                "Demo 2: Allow/Deny Rules",
                "Demo 3: Allow Responses",
                "Demo 4: Queue Permissions",
                "Demo 5-7: Account Features",
            ]
        );
    }

    #[tokio::test]
    async fn invalid_choice_then_exit() -> Result<()> {
        let prompt = ScriptedPrompt::new(["42", "", "0"]);
        run_menu(&prompt, &settings()).await
    }

    #[tokio::test]
    async fn end_of_input_exits() -> Result<()> {
        run_menu(&ScriptedPrompt::new(Vec::<String>::new()), &settings()).await
    }

    #[tokio::test]
    async fn end_of_input_before_demo_starts() -> Result<()> {
        // The demo would need a server; input ends at its confirmation prompt.
        run_menu(&ScriptedPrompt::new(["1"]), &settings()).await?;
        run_menu(&ScriptedPrompt::new(["8"]), &settings()).await
    }
}
