// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use async_nats::Message;
use log::error;
use tabled::{settings::Style, Table, Tabled};

use crate::{connection::payload_text, error::Error};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Expectation {
    Allowed,
    Denied,
    /// Nothing should arrive.
    Silent,
}

impl Display for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Silent => "no delivery",
        })
    }
}

#[derive(Clone, Debug, Tabled)]
pub(crate) struct Check {
    #[tabled(rename = "Check")]
    pub(crate) label: String,
    #[tabled(rename = "Expected")]
    pub(crate) expected: Expectation,
    #[tabled(rename = "Result", display_with = "Self::format_passed")]
    pub(crate) passed: bool,
    #[tabled(rename = "Detail")]
    pub(crate) detail: String,
}

impl Check {
    fn format_passed(passed: &bool) -> String {
        if *passed { "✓" } else { "✗" }.to_owned()
    }
}

/// The outcome of one demo: every scripted check in the order it ran.
#[derive(Debug, Default)]
pub(crate) struct Report {
    title: String,
    checks: Vec<Check>,
}

impl Report {
    pub(crate) fn new(title: &str) -> Self {
        println!("\n=== {title} Demo ===");
        Self {
            title: title.to_owned(),
            checks: Vec::new(),
        }
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub(crate) fn section(&self, heading: &str) {
        println!("\n{heading}");
    }

    fn record(&mut self, label: &str, expected: Expectation, passed: bool, detail: String) {
        if passed {
            println!("✓ {label}");
        } else {
            println!("✗ {label}: {detail}");
        }
        self.checks.push(Check {
            label: label.to_owned(),
            expected,
            passed,
            detail,
        });
    }

    /// Records a check that should have succeeded and hands back its value.
    pub(crate) fn expect_allowed<T>(&mut self, label: &str, result: Result<T, Error>) -> Option<T> {
        match result {
            Ok(value) => {
                self.record(label, Expectation::Allowed, true, String::new());
                Some(value)
            }
            Err(e) => {
                error!("{label}: {e}");
                self.record(label, Expectation::Allowed, false, e.to_string());
                None
            }
        }
    }

    /// Records a check that the server should have refused. Only a permission
    /// denial counts; any other error is a failure of the demo itself.
    pub(crate) fn expect_denied<T>(&mut self, label: &str, result: Result<T, Error>) {
        match result {
            Err(e) if e.is_denial() => {
                println!("  ({e})");
                self.record(label, Expectation::Denied, true, e.to_string());
            }
            Err(e) => {
                error!("{label}: {e}");
                self.record(label, Expectation::Denied, false, e.to_string());
            }
            Ok(_) => self.record(
                label,
                Expectation::Denied,
                false,
                "the server accepted the operation".to_owned(),
            ),
        }
    }

    /// Records a check that no message should have been delivered.
    pub(crate) fn expect_silent(&mut self, label: &str, received: Option<&Message>) {
        match received {
            None => self.record(label, Expectation::Silent, true, String::new()),
            Some(message) => self.record(
                label,
                Expectation::Silent,
                false,
                format!("received {:?} on {}", payload_text(message), message.subject),
            ),
        }
    }

    /// Records an arbitrary condition observed by the demo.
    pub(crate) fn expect_true(&mut self, label: &str, condition: bool, detail: String) {
        self.record(label, Expectation::Allowed, condition, detail);
    }

    pub(crate) fn extend(&mut self, checks: Vec<Check>) {
        self.checks.extend(checks);
    }

    /// Moves checks recorded in a background task into a plain list.
    pub(crate) fn into_checks(self) -> Vec<Check> {
        self.checks
    }

    pub(crate) fn failures(&self) -> usize {
        self.checks.iter().filter(|check| !check.passed).count()
    }

    pub(crate) fn finish(&self) {
        println!("\n=== {} Demo Complete ===", self.title);
    }

    pub(crate) fn summary(&self) -> String {
        Table::new(&self.checks).with(Style::rounded()).to_string()
    }
}

/// A report for checks made from inside a spawned task. It does not print a
/// demo banner.
pub(crate) fn task_report(title: &str) -> Report {
    Report {
        title: title.to_owned(),
        checks: Vec::new(),
    }
}
