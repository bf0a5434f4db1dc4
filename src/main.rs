// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use std::env;

use the_sluice::config::{load_and_validate_config, Config, RuntimeBuilder};
use the_sluice::engine::{Observable, Scheduler};

const DEFAULT_COMMANDS: [&str; 3] = ["echo before", "sleep", "echo after"];
const DEFAULT_FLOOD_COMMANDS: [&str; 2] = ["echo ping", "sleep"];

struct Args {
    config: Option<String>,
    flood: bool,
    commands: Vec<String>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config <file.yaml>] [--flood] [command ...]\n\
         Example: {} \"echo hello\" sleep \"echo goodbye\"\n\
         Flood:   {} --flood \"echo ping\" sleep",
        program, program, program
    )
}

fn parse_args(args: &[String]) -> Result<Args> {
    let program = args.first().map(String::as_str).unwrap_or("the-sluice");
    let mut parsed = Args {
        config: None,
        flood: false,
        commands: Vec::new(),
    };

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => match rest.next() {
                Some(path) => parsed.config = Some(path.clone()),
                None => bail!("--config needs a file\n{}", usage(program)),
            },
            "--flood" => parsed.flood = true,
            "--help" | "-h" => bail!("{}", usage(program)),
            _ => parsed.commands.push(arg.clone()),
        }
    }
    Ok(parsed)
}

fn or_defaults(commands: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if commands.is_empty() {
        defaults.iter().map(|c| c.to_string()).collect()
    } else {
        commands
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let args = parse_args(&args)?;

    let config = match &args.config {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::default(),
    };
    let pipeline = RuntimeBuilder::from_config(&config);
    let scheduler = Scheduler::current()?;

    let output = if args.flood {
        let commands = or_defaults(args.commands, &DEFAULT_FLOOD_COMMANDS);
        let (flood, probe) = pipeline.flood(commands, pipeline.flood_limit())?;
        let output = flood.to_vec(&scheduler).await?;
        let stats = probe.snapshot();
        tracing::info!(
            offered = stats.offered,
            accepted = stats.accepted,
            dropped = stats.dropped,
            rejected = stats.rejected,
            "Flood finished"
        );
        output
    } else {
        let commands = or_defaults(args.commands, &DEFAULT_COMMANDS);
        pipeline
            .process(Observable::from_iter(commands))
            .to_vec(&scheduler)
            .await?
    };

    for line in output {
        println!("{}", line);
    }

    scheduler.shutdown().await;
    Ok(())
}
