//! Prints manual-test guidance for the AppImage release workflow

use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};
use std::process;
use workflow_guardian::guide::{help_listing, Topic};

#[derive(Parser)]
#[command(name = "release-test-guide")]
#[command(about = "Manual test guidance for the AppImage release workflow")]
#[command(version)]
struct Cli {
    /// Guidance topic to print; omit to list topics
    topic: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let exit_code = run(
        cli.topic.as_deref(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    if exit_code != 0 {
        process::exit(exit_code);
    }
    Ok(())
}

/// Print the listing or one topic; returns the process exit code
fn run(topic: Option<&str>, out: &mut impl Write, err: &mut impl Write) -> anyhow::Result<i32> {
    let Some(name) = topic else {
        write!(out, "{}", help_listing()).context("failed to write topic listing")?;
        return Ok(0);
    };

    match Topic::from_name(name) {
        Some(topic) => {
            writeln!(out, "{}", topic.render())
                .with_context(|| format!("failed to write guide for {topic}"))?;
            Ok(0)
        }
        None => {
            write!(err, "Error: unknown topic '{name}'\n\n{}", help_listing())
                .context("failed to write topic listing")?;
            Ok(1)
        }
    }
}
