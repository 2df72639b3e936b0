//! CLI command handlers.

pub mod auth;
pub mod budgets;
pub mod categories;
pub mod config;
pub mod dashboard;
pub mod open;
pub mod reports;
pub mod transactions;

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads one line from stdin, prompting on stderr when interactive.
pub(crate) fn read_line(prompt: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        eprint!("{prompt}: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("read {prompt}"))?;
    if read == 0 {
        anyhow::bail!("No {} provided on stdin", prompt.to_lowercase());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub(crate) fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

pub(crate) fn print_json(value: &Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("format report")?;
    println!("{pretty}");
    Ok(())
}
