// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Figura Team

//! Figura Kernel CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use figura::{Kernel, StringTemplate};
use std::fs;

#[derive(Parser)]
#[command(name = "figura")]
#[command(about = "Figura construction kernel - evaluate dynamic-geometry scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input script file
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Print the construction as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script and print the resulting construction
    Eval {
        /// Input script file
        input: String,

        /// Print the construction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a single statement given on the command line
    Run {
        /// Statement text, e.g. "A=(1,2)"
        statement: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Eval { input, json }) => eval_file(&input, json),
        Some(Commands::Run { statement }) => run_statement(&statement),
        None => match cli.input {
            Some(input) => eval_file(&input, cli.json),
            None => {
                eprintln!("{}", "No input file. Try: figura eval <script>".yellow());
                Ok(())
            }
        },
    }
}

fn eval_file(path: &str, json: bool) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read script '{}'", path))?;
    let mut kernel = Kernel::new();
    kernel
        .parse_and_evaluate(&source)
        .with_context(|| format!("Failed to evaluate '{}'", path))?;

    if json {
        println!("{}", kernel.export_json()?);
        return Ok(());
    }
    print_construction(&kernel);
    Ok(())
}

fn run_statement(statement: &str) -> Result<()> {
    let mut kernel = Kernel::new();
    kernel
        .parse_and_evaluate(statement)
        .context("Failed to evaluate statement")?;
    print_construction(&kernel);
    Ok(())
}

fn print_construction(kernel: &Kernel) {
    let display = StringTemplate::display();
    for geo in kernel.construction().objects() {
        let definition = kernel
            .definition(geo.id(), &display)
            .unwrap_or_default();
        let value = figura::io::value_string(geo.value(), &display, kernel.construction());
        println!(
            "{}  {}  {}",
            geo.label().bold(),
            definition.dimmed(),
            value.green()
        );
    }
}
