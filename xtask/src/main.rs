//! Workspace automation for ora-access.
//!
//! Run with `cargo xtask <command>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

const CRATES: &[&str] = &[
    "ora-types",
    "ora-client",
    "ora-pool",
    "ora-query",
    "ora-metadata",
    "ora-access",
    "ora-testing",
];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for ora-access")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format check, clippy and the full test suite
    Ci,
    /// Check formatting
    Fmt {
        /// Rewrite files instead of checking them
        #[arg(long)]
        fix: bool,
    },
    /// Lint every target with warnings denied
    Clippy,
    /// Run tests, optionally for a single crate
    Test {
        /// Crate to test (for example `ora-pool`)
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Look for unused dependencies (requires cargo-machete)
    Machete,
    /// Build API documentation
    Doc {
        /// Open the docs in a browser
        #[arg(long)]
        open: bool,
    },
    /// Remove build artifacts
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh, false)?;
            clippy(&sh)?;
            test(&sh, None)?;
            println!("ci: all checks passed");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test { package } => test(&sh, package.as_deref())?,
        Command::Machete => cmd!(sh, "cargo machete").run()?,
        Command::Doc { open } => doc(&sh, open)?,
        Command::Clean => cmd!(sh, "cargo clean").run()?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask must live one level below the workspace root")
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        cmd!(sh, "cargo fmt --all").run()?;
    } else {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    match package {
        Some(name) => {
            anyhow::ensure!(
                CRATES.contains(&name),
                "unknown crate `{name}`; expected one of {}",
                CRATES.join(", ")
            );
            cmd!(sh, "cargo test -p {name}").run()?;
        }
        None => cmd!(sh, "cargo test --workspace").run()?,
    }
    Ok(())
}

fn doc(sh: &Shell, open: bool) -> Result<()> {
    let open = open.then_some("--open");
    cmd!(sh, "cargo doc --workspace --no-deps {open...}").run()?;
    Ok(())
}
