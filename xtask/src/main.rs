use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the rendezvous engine workspace",
    long_about = "A unified CLI for running the demo, benchmarks and CI\n\
                  checks in the rendezvous engine workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the end-to-end rendezvous demo
    Run,
    /// Run the criterion benchmarks
    Bench,
    /// Run the checks CI runs: fmt, clippy, tests
    Ci,
}

// ── Helpers ────────────────────────────────────────────────────────

fn run(description: &str, command: &mut Command) -> ExitStatus {
    println!("==> {description}");
    match command.status() {
        Ok(status) => status,
        Err(error) => {
            eprintln!("failed to spawn {description}: {error}");
            exit(1);
        }
    }
}

fn require_success(description: &str, command: &mut Command) {
    let status = run(description, command);
    if !status.success() {
        eprintln!("{description} failed");
        exit(status.code().unwrap_or(1));
    }
}

// ── Commands ───────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run => {
            require_success(
                "rendezvous demo",
                Command::new("cargo").args([
                    "run",
                    "-p",
                    "rendezvous_core",
                    "--example",
                    "rendezvous_run",
                ]),
            );
        }
        Commands::Bench => {
            require_success(
                "benchmarks",
                Command::new("cargo").args(["bench", "-p", "rendezvous_core"]),
            );
        }
        Commands::Ci => {
            require_success(
                "cargo fmt --check",
                Command::new("cargo").args(["fmt", "--all", "--", "--check"]),
            );
            require_success(
                "cargo clippy",
                Command::new("cargo").args([
                    "clippy",
                    "--workspace",
                    "--all-targets",
                    "--",
                    "-D",
                    "warnings",
                ]),
            );
            require_success(
                "cargo test",
                Command::new("cargo").args(["test", "--workspace"]),
            );
        }
    }
}
