use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use wlfw_core::catalog::{DEVICE_NAMES, MSG_NAMES};
use wlfw_core::protocol::constants::*;
use wlfw_core::protocol::messages::{MemSegRequest, QmiMessage, RequestMemInd};
use wlfw_core::service::{BdfKind, BdfTarget, BumpReserver};
use wlfw_core::{
    MemoryBlobStore, MockTransport, ServiceAddress, WlfwConfig, WlfwService, WorkItem,
};

/// Reserved region handed out during simulation.
const SIM_MEM_BASE: u64 = 0x4B00_0000;
const SIM_MEM_LEN: u64 = 0x0400_0000;
const SIM_BOARD_DATA_LEN: usize = 24 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about = "WLAN firmware control-plane host tool", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or inspect a configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List message and device names
    Catalog,
    /// Run bring-up against an auto-answering loopback peer
    Simulate {
        /// Configuration file, defaults otherwise
        #[arg(long)]
        config: Option<PathBuf>,

        /// Serve board files from this directory instead of synthetic data
        #[arg(long)]
        firmware_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration
    Init { path: PathBuf },
    /// Print the resolved configuration
    Show { path: PathBuf },
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {e}");
    }

    let result = match args.command {
        Command::Config { action } => match action {
            ConfigAction::Init { path } => config_init(&path),
            ConfigAction::Show { path } => config_show(&path),
        },
        Command::Catalog => {
            catalog();
            Ok(())
        }
        Command::Simulate {
            config,
            firmware_dir,
        } => simulate(config.as_deref(), firmware_dir),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn config_init(path: &Path) -> Result<()> {
    WlfwConfig::default()
        .save_to_file(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn config_show(path: &Path) -> Result<()> {
    let config = WlfwConfig::load_from_file(path)
        .with_context(|| format!("reading {}", path.display()))?;
    println!("{config:#?}");
    println!("device name:      {}", config.device_name());
    println!("audit instance:   0x{:x}", config.audit_instance());
    println!("memory mode:      {}", config.mem_cfg_mode());
    println!("wlan clients:     {:?}", config.num_wlan_clients());
    println!("wlan vaps:        {:?}", config.num_wlan_vaps());
    println!("mlo topology:     {}", config.mlo_topology().is_some());
    Ok(())
}

fn catalog() {
    println!("Messages:");
    for (id, name) in MSG_NAMES {
        println!("  0x{id:04x}  {name}");
    }
    println!("Devices:");
    for (id, name) in DEVICE_NAMES {
        println!("  0x{id:04x}  {name}");
    }
}

fn simulate(config_path: Option<&Path>, firmware_dir: Option<PathBuf>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => WlfwConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => WlfwConfig::default(),
    };
    let synthetic = firmware_dir.is_none();
    if let Some(dir) = firmware_dir {
        config.firmware_dir = dir;
    }

    let transport = Arc::new(MockTransport::with_auto_success());
    let mut builder = WlfwService::builder(transport, config.clone());
    let blobs = Arc::new(MemoryBlobStore::new());
    if synthetic {
        builder = builder.blobs(blobs.clone());
    }
    let (service, work) = builder.build();

    info!(device = %config.device_name(), "Simulating firmware bring-up");
    service.server_arrive(ServiceAddress {
        node: 1,
        port: 0x4000,
    })?;

    if synthetic {
        let ftm_marker = config.ftm_marker_path.as_ref().is_some_and(|p| p.exists());
        let target = BdfTarget::new(&config, &service.identity(), ftm_marker);
        if let Some(name) = target.candidates(BdfKind::BoardData).last() {
            info!(file = %name, "Serving synthetic board data");
            blobs.insert(name.clone(), vec![0xA5; SIM_BOARD_DATA_LEN]);
        }
    }

    let request = RequestMemInd {
        declared_len: 2,
        segments: vec![
            MemSegRequest {
                size: 0x0020_0000,
                mem_type: 1,
            },
            MemSegRequest {
                size: 0x0008_0000,
                mem_type: CNSS_MEM_CAL,
            },
        ],
    };
    service.handle_indication(QMI_WLFW_REQUEST_MEM_IND, Some(1), &request.to_bytes());
    service.reserve_firmware_memory(&BumpReserver::new(SIM_MEM_BASE, SIM_MEM_LEN))?;
    service.respond_mem()?;
    service.handle_indication(QMI_WLFW_FW_MEM_READY_IND, Some(2), &[]);
    service.download_board_files()?;
    service.handle_indication(QMI_WLFW_FW_INIT_DONE_IND, Some(3), &[]);

    let items: Vec<WorkItem> = work.try_iter().collect();
    println!("Work items:");
    for item in &items {
        println!("  {item}");
    }
    println!("Audit log:");
    for line in service.history().dump_lines() {
        println!("  {line}");
    }
    println!("Final state: {:?} {:?}", service.lifecycle(), service.flags());
    Ok(())
}
