//! Negotiated state for one firmware peer.

use std::fmt;

use crate::protocol::constants::BDF_DNLD_METHOD_DIRECT_COPY;
use crate::protocol::messages::{CapResp, DevMemInfo};
use crate::transport::ServiceAddress;

bitflags::bitflags! {
    /// Driver state bits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct DriverState: u32 {
        /// WLFW channel bound to the discovered service.
        const WLFW_CONNECTED = 1 << 0;
        /// Firmware memory hand-off acknowledged.
        const FW_MEM_READY = 1 << 1;
        /// Firmware initialisation done.
        const FW_READY = 1 << 2;
        /// QDSS tracing switched on.
        const QDSS_STARTED = 1 << 3;
        /// A recovery flow owns the device.
        const DRIVER_RECOVERY = 1 << 4;
        const COEX_CONNECTED = 1 << 5;
        const IMS_CONNECTED = 1 << 6;
        /// Cold-boot calibration run in progress.
        const CAL_IN_PROGRESS = 1 << 7;
        /// The single-client IPC daemon is attached.
        const DAEMON_CONNECTED = 1 << 8;
    }
}

/// Where the service sits in its discovery lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Undiscovered,
    /// Service discovered, channel not yet bound.
    Arrived,
    Connected,
    BringupComplete,
    Disconnected,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Undiscovered => write!(f, "UNDISCOVERED"),
            LifecycleState::Arrived => write!(f, "ARRIVED"),
            LifecycleState::Connected => write!(f, "CONNECTED"),
            LifecycleState::BringupComplete => write!(f, "BRINGUP_COMPLETE"),
            LifecycleState::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// How board data reaches the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BdfMethod {
    /// File contents streamed in chunks.
    #[default]
    Streamed,
    /// Only the file name is sent; the host places the data itself.
    DirectCopy,
}

/// Identity reported by the target capability exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    pub chip_id: u32,
    pub chip_family: u32,
    /// `0xFF` when the target did not report one.
    pub board_id: u32,
    pub soc_id: u32,
    pub fw_version: u32,
    pub fw_build_timestamp: String,
    pub device_freq_hz: u32,
    pub otp_version: u32,
    /// Seconds; zero when EEPROM calibration reads are unsupported.
    pub eeprom_caldata_read_timeout: u32,
    pub dev_mem: Vec<DevMemInfo>,
    pub bdf_method: BdfMethod,
    pub regdb_mandatory: bool,
    pub rxgainlut_support: bool,
}

impl Default for BoardIdentity {
    fn default() -> Self {
        Self {
            chip_id: 0,
            chip_family: 0,
            board_id: 0xFF,
            soc_id: 0,
            fw_version: 0,
            fw_build_timestamp: String::new(),
            device_freq_hz: 0,
            otp_version: 0,
            eeprom_caldata_read_timeout: 0,
            dev_mem: Vec::new(),
            bdf_method: BdfMethod::Streamed,
            regdb_mandatory: false,
            rxgainlut_support: false,
        }
    }
}

impl BoardIdentity {
    /// Fold a capability response in. Absent fields keep their value,
    /// except the board id which falls back to `0xFF`.
    pub fn apply(&mut self, caps: &CapResp) {
        if let Some((chip_id, chip_family)) = caps.chip_info {
            self.chip_id = chip_id;
            self.chip_family = chip_family;
        }
        self.board_id = caps.board_id.unwrap_or(0xFF);
        if let Some(soc_id) = caps.soc_id {
            self.soc_id = soc_id;
        }
        if let Some((version, timestamp)) = &caps.fw_version_info {
            self.fw_version = *version;
            self.fw_build_timestamp = timestamp.clone();
        }
        if let Some(freq) = caps.time_freq_hz {
            self.device_freq_hz = freq;
        }
        if let Some(otp) = caps.otp_version {
            self.otp_version = otp;
        }
        if let Some(t) = caps.eeprom_caldata_read_timeout {
            self.eeprom_caldata_read_timeout = t;
        }
        if let Some(mem) = &caps.dev_mem_info {
            self.dev_mem = mem.clone();
        }
        if let Some(method) = caps.bdf_dnld_method {
            self.bdf_method = if u32::from(method) == BDF_DNLD_METHOD_DIRECT_COPY {
                BdfMethod::DirectCopy
            } else {
                BdfMethod::Streamed
            };
        }
        if let Some(m) = caps.regdb_mandatory {
            self.regdb_mandatory = m;
        }
        if let Some(s) = caps.rxgainlut_support {
            self.rxgainlut_support = s;
        }
    }
}

/// One block the firmware asked the host to allocate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FwMemSegment {
    pub mem_type: u32,
    pub size: u32,
    pub phys: u64,
    pub virt: u64,
}

impl FwMemSegment {
    pub fn is_reserved(&self) -> bool {
        self.phys != 0 && self.size != 0
    }
}

/// Results of the pin connectivity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinResult {
    pub pwr_pin: Option<u32>,
    pub phy_io_pin: Option<u32>,
    pub rf_pin: Option<u32>,
}

/// Everything the service knows about its peer.
#[derive(Debug, Clone, Default)]
pub struct PeerState {
    pub flags: DriverState,
    pub lifecycle: LifecycleState,
    pub address: Option<ServiceAddress>,
    pub identity: BoardIdentity,
    /// Firmware memory segments, bounded by the protocol maximum.
    pub fw_mem: Vec<FwMemSegment>,
    /// Segment count the firmware declared, before clamping.
    pub fw_mem_declared: usize,
    /// Index of the calibration-data segment, if any.
    pub cal_mem: Option<usize>,
    pub qdss_mem: Vec<FwMemSegment>,
    pub m3_mem: Option<FwMemSegment>,
    pub pin_result: PinResult,
    pub cal_file_upload_size: Option<u64>,
    /// Host-side cold-boot calibration completed, advertised in host caps.
    pub cal_done: bool,
    pub fw_ini_cfg_support: bool,
    /// Antenna reported by the last antenna switch.
    pub antenna: u64,
    /// Grant to send with the next antenna grant request.
    pub grant: u64,
    pub tgt_mem_cfg_mode: u32,
    /// BAR reported by device info.
    pub bar: Option<(u64, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::ResponseStatus;

    #[test]
    fn test_board_id_defaults_to_sentinel() {
        let mut id = BoardIdentity {
            board_id: 0x12,
            ..Default::default()
        };
        id.apply(&CapResp {
            resp: ResponseStatus::SUCCESS,
            chip_info: Some((0x1A, 0x4)),
            ..Default::default()
        });
        assert_eq!(id.board_id, 0xFF);
        assert_eq!(id.chip_id, 0x1A);
    }

    #[test]
    fn test_apply_full_caps() {
        let mut id = BoardIdentity::default();
        id.apply(&CapResp {
            resp: ResponseStatus::SUCCESS,
            board_id: Some(0x1019),
            fw_version_info: Some((0x0102, "2024-01-01".into())),
            bdf_dnld_method: Some(1),
            regdb_mandatory: Some(true),
            eeprom_caldata_read_timeout: Some(7),
            ..Default::default()
        });
        assert_eq!(id.board_id, 0x1019);
        assert_eq!(id.fw_build_timestamp, "2024-01-01");
        assert_eq!(id.bdf_method, BdfMethod::DirectCopy);
        assert!(id.regdb_mandatory);
        assert_eq!(id.eeprom_caldata_read_timeout, 7);
    }

    #[test]
    fn test_flags() {
        let mut f = DriverState::WLFW_CONNECTED | DriverState::FW_READY;
        f.remove(DriverState::FW_READY);
        assert!(f.contains(DriverState::WLFW_CONNECTED));
        assert!(!f.contains(DriverState::FW_READY));
    }
}
