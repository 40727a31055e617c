mod build;
mod constants;
mod flash;
mod rtt;

use anyhow::Result;
use clap::Parser;

use crate::constants::app_elf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build the firmware
    Build {
        #[arg(long)]
        features: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Flash the firmware
    Flash {
        #[arg(long)]
        features: Option<String>,
        #[arg(long)]
        release: bool,
        #[arg(long)]
        force: bool,
    },
    /// Build, flash and run the firmware with RTT
    Run {
        #[arg(long)]
        features: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Attach RTT to a running target
    Attach {
        #[arg(long)]
        release: bool,
    },
    /// Run the transport tests on the host
    Test {
        #[arg(long)]
        features: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build { features, release } => {
            println!("Building firmware...");
            build::build_firmware(features.as_deref(), *release)?;
            println!("Build complete!");
        }
        Commands::Flash { features, release, force } => {
            flash::flash_firmware(features.as_deref(), *release, *force)?;
        }
        Commands::Run { features, release } => {
            flash::flash_firmware(features.as_deref(), *release, false)?;

            println!("Attaching RTT...");
            rtt::run(&app_elf(*release))?;
        }
        Commands::Attach { release } => {
            rtt::run(&app_elf(*release))?;
        }
        Commands::Test { features } => {
            build::test_host(features.as_deref())?;
        }
    }

    Ok(())
}
