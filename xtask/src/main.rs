use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the workspace
    Build,
    /// Run the workspace tests
    Test,
    /// Run the loopback bring-up simulation
    Simulate {
        /// Board files directory passed through to the simulation
        #[arg(long)]
        firmware_dir: Option<String>,
    },
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{} failed", what);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building workspace...");
            cargo(&["build", "--workspace"], "Build")?;
        }
        Commands::Test => {
            println!("Testing workspace...");
            cargo(&["test", "--workspace"], "Test")?;
        }
        Commands::Simulate { firmware_dir } => {
            println!("Running simulation...");
            let mut args = vec!["run", "-p", "wlfw-cli", "--", "simulate"];
            if let Some(dir) = firmware_dir {
                args.push("--firmware-dir");
                args.push(dir);
            }
            cargo(&args, "Simulation")?;
        }
    }

    Ok(())
}
