//! Board-data file naming.
//!
//! Names are a pure function of the artifact kind and the target identity.
//! Each kind yields an ordered list of candidates: the first one present in
//! the blob store is used, and when none is present the last one is what
//! gets reported missing.

use std::fmt;

use crate::config::{BusType, WlfwConfig};
use crate::protocol::constants::*;
use crate::state::BoardIdentity;

/// Artifacts delivered through board-data download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdfKind {
    /// Golden board data. Mandatory.
    BoardData,
    CalData,
    Hds,
    RegDb,
    RxGainLut,
}

impl BdfKind {
    /// Type code carried in the download request.
    pub fn bdf_type(&self) -> u8 {
        match self {
            BdfKind::BoardData => BDF_TYPE_GOLDEN,
            BdfKind::CalData => BDF_TYPE_CALDATA,
            BdfKind::Hds => BDF_TYPE_HDS,
            BdfKind::RegDb => BDF_TYPE_REGDB,
            BdfKind::RxGainLut => BDF_TYPE_RXGAINLUT,
        }
    }
}

impl fmt::Display for BdfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BdfKind::BoardData => "board data",
            BdfKind::CalData => "calibration data",
            BdfKind::Hds => "HDS",
            BdfKind::RegDb => "RegDB",
            BdfKind::RxGainLut => "RX gain LUT",
        };
        f.write_str(name)
    }
}

/// Identity inputs to file naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdfTarget {
    pub device_id: u32,
    pub bus: BusType,
    /// Board id from target capabilities, `0xFF` when unselected.
    pub board_id: u32,
    /// Zero means no override.
    pub board_id_override: u32,
    /// Board id width in bytes.
    pub id_width: u32,
    pub bus_slot: u32,
    pub userpd_id: u32,
    /// The FTM configuration marker exists.
    pub ftm_marker: bool,
    /// Firmware sub-path prepended to every name.
    pub fw_path: String,
}

impl BdfTarget {
    pub fn new(config: &WlfwConfig, identity: &BoardIdentity, ftm_marker: bool) -> Self {
        Self {
            device_id: config.device.device_id,
            bus: config.device.bus,
            board_id: identity.board_id,
            board_id_override: config.device.board_id_override,
            id_width: config.device.board_id_width,
            bus_slot: config.device.bus_slot,
            userpd_id: config.device.userpd_id,
            ftm_marker,
            fw_path: config.fw_path.clone(),
        }
    }

    fn hex(&self, id: u32) -> String {
        format!("{:0w$x}", id, w = (self.id_width * 2) as usize)
    }

    /// Override when set, else the reported board id.
    fn effective_board_id(&self) -> u32 {
        if self.board_id_override != 0 {
            self.board_id_override
        } else {
            self.board_id
        }
    }

    /// Older firmware ships one-byte board ids without the type nibble.
    fn legacy_suffix(&self) -> String {
        format!("{:02x}", self.board_id_override & !FW_TYPE_MASK)
    }

    fn path(&self, name: impl AsRef<str>) -> String {
        format!("{}{}", self.fw_path, name.as_ref())
    }

    /// Candidate names in lookup order.
    pub fn candidates(&self, kind: BdfKind) -> Vec<String> {
        let is_qcn9224 = self.device_id == QCN9224_DEVICE_ID;
        let mut names = Vec::new();
        match kind {
            BdfKind::BoardData => {
                if self.board_id_override == 0 && self.board_id == 0xFF {
                    names.push(self.path(DEFAULT_BDF_FILE_NAME));
                } else {
                    let id = self.hex(self.effective_board_id());
                    names.push(self.path(format!("{BDF_FILE_NAME_PREFIX}{id}")));
                }
                if is_qcn9224 {
                    let legacy = self.legacy_suffix();
                    names.push(self.path(format!("{BDF_FILE_NAME_PREFIX}{legacy}")));
                }
            }
            BdfKind::CalData => names.push(self.path(self.cal_file_name())),
            BdfKind::Hds => names.push(self.path(HDS_FILE_NAME)),
            BdfKind::RegDb => {
                let id = self.hex(self.effective_board_id());
                names.push(self.path(format!("{REGDB_FILE_NAME_PREFIX}{id}")));
                names.push(self.path(DEFAULT_REGDB_FILE_NAME));
            }
            BdfKind::RxGainLut => {
                let id = self.hex(self.effective_board_id());
                names.push(self.path(format!("{RXGAINLUT_FILE_NAME_PREFIX}{id}")));
                names.push(self.path(DEFAULT_RXGAINLUT_FILE_NAME));
                if is_qcn9224 {
                    let legacy = self.legacy_suffix();
                    names.push(self.path(format!("{RXGAINLUT_FILE_NAME_PREFIX}{legacy}")));
                }
            }
        }
        names
    }

    fn cal_file_name(&self) -> String {
        let board = self.hex(self.effective_board_id());
        if self.bus == BusType::Pci {
            let slot = self.bus_slot + 1;
            return if self.ftm_marker {
                format!("{CAL_FILE_PREFIX}{slot}.b{board}")
            } else {
                format!("{CAL_FILE_PREFIX}{slot}{CAL_FILE_SUFFIX}")
            };
        }
        match self.device_id {
            QCN6122_DEVICE_ID | QCN9160_DEVICE_ID => {
                format!("{CAL_FILE_PREFIX}{}{CAL_FILE_SUFFIX}", self.userpd_id)
            }
            QCN6432_DEVICE_ID if self.ftm_marker => {
                format!("{CAL_FILE_PREFIX}{}.b{board}", self.userpd_id)
            }
            QCN6432_DEVICE_ID => {
                format!("{CAL_FILE_PREFIX}{}{CAL_FILE_SUFFIX}", self.userpd_id)
            }
            _ => DEFAULT_CAL_FILE_NAME.to_string(),
        }
    }
}

/// File name zero-padded to the fixed width sent for direct-copy and EEPROM
/// downloads.
pub fn padded_file_name(name: &str) -> Vec<u8> {
    let mut buf = vec![0u8; MAX_BDF_FILE_NAME];
    let n = name.len().min(MAX_BDF_FILE_NAME - 1);
    buf[..n].copy_from_slice(&name.as_bytes()[..n]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pci_target() -> BdfTarget {
        BdfTarget {
            device_id: QCN9224_DEVICE_ID,
            bus: BusType::Pci,
            board_id: 0xFF,
            board_id_override: 0,
            id_width: 2,
            bus_slot: 0,
            userpd_id: 0,
            ftm_marker: false,
            fw_path: "qcn9224/".into(),
        }
    }

    #[test]
    fn test_golden_default_name() {
        let t = BdfTarget {
            device_id: QCN9000_DEVICE_ID,
            ..pci_target()
        };
        assert_eq!(t.candidates(BdfKind::BoardData), vec!["qcn9224/bdwlan.bin"]);
    }

    #[test]
    fn test_golden_board_specific_name() {
        let t = BdfTarget {
            device_id: QCN9000_DEVICE_ID,
            board_id: 0x1019,
            ..pci_target()
        };
        assert_eq!(t.candidates(BdfKind::BoardData), vec!["qcn9224/bdwlan.b1019"]);

        let narrow = BdfTarget {
            id_width: 1,
            board_id: 0x12,
            ..t
        };
        assert_eq!(narrow.candidates(BdfKind::BoardData), vec!["qcn9224/bdwlan.b12"]);
    }

    #[test]
    fn test_override_wins_with_legacy_fallback() {
        let t = BdfTarget {
            board_id: 0x1019,
            board_id_override: 0x1002,
            ..pci_target()
        };
        assert_eq!(
            t.candidates(BdfKind::BoardData),
            vec!["qcn9224/bdwlan.b1002", "qcn9224/bdwlan.b02"]
        );
    }

    #[test]
    fn test_caldata_names() {
        let mut t = BdfTarget {
            bus_slot: 1,
            board_id: 0x1019,
            ..pci_target()
        };
        assert_eq!(t.candidates(BdfKind::CalData), vec!["qcn9224/caldata_2.bin"]);
        t.ftm_marker = true;
        assert_eq!(t.candidates(BdfKind::CalData), vec!["qcn9224/caldata_2.b1019"]);

        let userpd = BdfTarget {
            device_id: QCN6122_DEVICE_ID,
            bus: BusType::Ahb,
            userpd_id: USERPD_1,
            fw_path: String::new(),
            ..pci_target()
        };
        assert_eq!(userpd.candidates(BdfKind::CalData), vec!["caldata_2.bin"]);

        let qcn6432 = BdfTarget {
            device_id: QCN6432_DEVICE_ID,
            ftm_marker: true,
            board_id: 0x40,
            ..userpd
        };
        assert_eq!(qcn6432.candidates(BdfKind::CalData), vec!["caldata_2.b0040"]);

        let ahb = BdfTarget {
            device_id: QCA5332_DEVICE_ID,
            bus: BusType::Ahb,
            ..pci_target()
        };
        assert_eq!(ahb.candidates(BdfKind::CalData), vec!["qcn9224/caldata.bin"]);
    }

    #[test]
    fn test_regdb_and_rxgainlut_fallbacks() {
        let t = BdfTarget {
            board_id: 0x1019,
            ..pci_target()
        };
        assert_eq!(
            t.candidates(BdfKind::RegDb),
            vec!["qcn9224/regdb.b1019", "qcn9224/regdb.bin"]
        );
        assert_eq!(
            t.candidates(BdfKind::RxGainLut),
            vec![
                "qcn9224/rxgainlut.b1019",
                "qcn9224/rxgainlut.bin",
                "qcn9224/rxgainlut.b00"
            ]
        );
        assert_eq!(t.candidates(BdfKind::Hds), vec!["qcn9224/hds.bin"]);
    }

    #[test]
    fn test_padded_name() {
        let buf = padded_file_name("qcn9224/bdwlan.b1019");
        assert_eq!(buf.len(), MAX_BDF_FILE_NAME);
        assert_eq!(&buf[..20], b"qcn9224/bdwlan.b1019");
        assert!(buf[20..].iter().all(|&b| b == 0));
    }
}
