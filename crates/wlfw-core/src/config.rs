//! Service configuration, persisted as TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::fault::FaultPolicy;
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::protocol::constants::*;
use crate::protocol::messages::MloTopology;

/// Module parameter value meaning "not set" for the memory mode.
pub const MEM_MODE_UNSET: u32 = 0xFF;

/// Bus the target sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Pci,
    Ahb,
}

/// Device identity and the properties read during capability negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub device_id: u32,
    pub bus: BusType,
    /// Name used in per-device file names; defaults to the catalog name.
    pub name: Option<String>,
    /// PCI slot index.
    pub bus_slot: u32,
    pub userpd_id: u32,
    /// Zero means no override.
    pub board_id_override: u32,
    /// Board id width in bytes, for file-name formatting.
    pub board_id_width: u32,
    pub gpios: Vec<u32>,
    pub platform_model: Option<String>,
    pub mem_mode: Option<u32>,
    pub num_wlan_clients: Option<u16>,
    pub num_wlan_vaps: Option<u8>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: QCN9224_DEVICE_ID,
            bus: BusType::Pci,
            name: None,
            bus_slot: 0,
            userpd_id: 0,
            board_id_override: 0,
            board_id_width: 2,
            gpios: Vec::new(),
            platform_model: None,
            mem_mode: None,
            num_wlan_clients: None,
            num_wlan_vaps: None,
        }
    }
}

/// Overrides that win over device properties when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleParams {
    /// `0xFF` means unset.
    pub mem_mode: u32,
    /// Zero means unset.
    pub num_wlan_clients: u16,
    /// Zero means unset.
    pub num_wlan_vaps: u8,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            mem_mode: MEM_MODE_UNSET,
            num_wlan_clients: 0,
            num_wlan_vaps: 0,
        }
    }
}

/// Multi-link group membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MloConfig {
    /// Multi-link operation enabled for this boot.
    pub enabled: bool,
    /// The device can take part in a group.
    pub capable: bool,
    pub topology: MloTopology,
}

/// Configuration for a WLFW service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WlfwConfig {
    /// Service instance id used for lookup and audit records.
    pub instance_id: u32,
    pub firmware_dir: PathBuf,
    /// Prefix prepended to every firmware file name, e.g. `"qcn9224/"`.
    pub fw_path: String,
    pub timeout_ms: u64,
    /// Rounded up to a power of two.
    pub history_size: usize,
    pub max_chunk: usize,
    pub fault_policy: FaultPolicy,
    pub cold_boot_support: bool,
    /// Scatter-gather ETR mode for QDSS trace memory.
    pub qdss_etr_sg_mode: bool,
    pub qdss_dump_dir: PathBuf,
    /// Its presence selects board-specific calibration files.
    pub ftm_marker_path: Option<PathBuf>,
    pub device: DeviceConfig,
    pub params: ModuleParams,
    pub mlo: Option<MloConfig>,
}

impl Default for WlfwConfig {
    fn default() -> Self {
        Self {
            instance_id: FW_ID_BASE + QCN9224_0,
            firmware_dir: PathBuf::from("/lib/firmware"),
            fw_path: String::new(),
            timeout_ms: QMI_WLFW_TIMEOUT_MS,
            history_size: DEFAULT_HISTORY_SIZE,
            max_chunk: QMI_WLFW_MAX_DATA_SIZE,
            fault_policy: FaultPolicy::Log,
            cold_boot_support: false,
            qdss_etr_sg_mode: false,
            qdss_dump_dir: PathBuf::from("/tmp/qdss"),
            ftm_marker_path: Some(PathBuf::from("/tmp/ftm.conf")),
            device: DeviceConfig::default(),
            params: ModuleParams::default(),
            mlo: None,
        }
    }
}

impl WlfwConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WlfwConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Module parameter, then device property, then zero.
    pub fn mem_cfg_mode(&self) -> u32 {
        if self.params.mem_mode != MEM_MODE_UNSET {
            self.params.mem_mode
        } else {
            self.device.mem_mode.unwrap_or(0)
        }
    }

    pub fn num_wlan_clients(&self) -> Option<u16> {
        match self.params.num_wlan_clients {
            0 => self.device.num_wlan_clients,
            n => Some(n),
        }
    }

    pub fn num_wlan_vaps(&self) -> Option<u8> {
        match self.params.num_wlan_vaps {
            0 => self.device.num_wlan_vaps,
            n => Some(n),
        }
    }

    /// Instance id stamped on audit records. AHB targets are logged under
    /// their device id.
    pub fn audit_instance(&self) -> u32 {
        match self.device.bus {
            BusType::Ahb => self.device.device_id,
            BusType::Pci => self.instance_id,
        }
    }

    pub fn device_name(&self) -> String {
        self.device
            .name
            .clone()
            .unwrap_or_else(|| catalog::device_name(self.audit_instance()).to_string())
    }

    /// Firmware file name with the configured sub-path.
    pub fn fw_file(&self, name: &str) -> String {
        format!("{}{}", self.fw_path, name)
    }

    /// Topology to advertise, if multi-link is enabled and capable.
    pub fn mlo_topology(&self) -> Option<&MloTopology> {
        self.mlo
            .as_ref()
            .filter(|m| m.enabled && m.capable)
            .map(|m| &m.topology)
    }
}
