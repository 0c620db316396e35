//! Mode, configuration and diagnostic control messages.

use serde::{Deserialize, Serialize};

use super::{MloTopology, QmiMessage, QmiResponse, ResponseStatus};
use crate::protocol::constants::*;
use crate::protocol::tlv::{CodecError, MAX_BLOB_LEN, TlvReader, TlvWriter};

// ============================================================================
// WLAN mode
// ============================================================================

/// Operating mode requested from the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum WlanMode {
    Mission = 0,
    Ftm = 1,
    Epping = 2,
    Waltest = 3,
    Off = 4,
    Ccpm = 5,
    Qvit = 6,
    Calibration = 7,
    FtmCalibration = 10,
}

impl WlanMode {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Mission,
            1 => Self::Ftm,
            2 => Self::Epping,
            3 => Self::Waltest,
            4 => Self::Off,
            5 => Self::Ccpm,
            6 => Self::Qvit,
            7 => Self::Calibration,
            10 => Self::FtmCalibration,
            _ => return None,
        })
    }
}

impl std::fmt::Display for WlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mission => "MISSION",
            Self::Ftm => "FTM",
            Self::Epping => "EPPING",
            Self::Waltest => "WALTEST",
            Self::Off => "OFF",
            Self::Ccpm => "CCPM",
            Self::Qvit => "QVIT",
            Self::Calibration => "COLDBOOT CALIBRATION",
            Self::FtmCalibration => "FTM COLDBOOT CALIBRATION",
        };
        write!(f, "{}({})", name, *self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WlanModeReq {
    pub mode: WlanMode,
    pub hw_debug: Option<bool>,
}

impl QmiMessage for WlanModeReq {
    const MSG_ID: u16 = QMI_WLFW_WLAN_MODE_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.mode as u32)
            .put_opt_bool(0x10, self.hw_debug);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let mode = WlanMode::from_u32(r.req_u32(0x01)?)
            .ok_or(CodecError::Malformed { tag: 0x01 })?;
        Ok(Self {
            mode,
            hw_debug: r.opt_bool(0x10)?,
        })
    }
}

status_response!(WlanModeResp = QMI_WLFW_WLAN_MODE_REQ);
request!(WlanModeReq => WlanModeResp);

// ============================================================================
// WLAN configuration
// ============================================================================

/// Copy-engine pipe configuration on the target side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CePipeConfig {
    pub pipe_num: u32,
    pub pipe_dir: u32,
    pub nentries: u32,
    pub nbytes_max: u32,
    pub flags: u32,
}

/// Service to pipe mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePipeMap {
    pub service_id: u32,
    pub pipe_dir: u32,
    pub pipe_num: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRegV2 {
    pub addr: u32,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WlanCfgReq {
    pub host_version: String,
    #[serde(default)]
    pub tgt_cfg: Vec<CePipeConfig>,
    #[serde(default)]
    pub svc_cfg: Vec<ServicePipeMap>,
    #[serde(default)]
    pub shadow_reg_v2: Vec<ShadowRegV2>,
}

impl WlanCfgReq {
    /// Drops entries beyond what one request can carry.
    pub fn clamp(&mut self) {
        self.tgt_cfg.truncate(QMI_WLFW_MAX_NUM_CE);
        self.svc_cfg.truncate(QMI_WLFW_MAX_NUM_SVC);
        self.shadow_reg_v2.truncate(QMI_WLFW_MAX_NUM_SHADOW_REG_V2);
    }
}

impl QmiMessage for WlanCfgReq {
    const MSG_ID: u16 = QMI_WLFW_WLAN_CFG_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        let tgt = &self.tgt_cfg[..self.tgt_cfg.len().min(QMI_WLFW_MAX_NUM_CE)];
        let svc = &self.svc_cfg[..self.svc_cfg.len().min(QMI_WLFW_MAX_NUM_SVC)];
        let shadow = &self.shadow_reg_v2
            [..self.shadow_reg_v2.len().min(QMI_WLFW_MAX_NUM_SHADOW_REG_V2)];
        w.put_str(0x10, &self.host_version, QMI_WLFW_MAX_STR_LEN)
            .put_list(0x11, tgt.iter(), |b, c| {
                b.u32(c.pipe_num)
                    .u32(c.pipe_dir)
                    .u32(c.nentries)
                    .u32(c.nbytes_max)
                    .u32(c.flags);
            })
            .put_list(0x12, svc.iter(), |b, s| {
                b.u32(s.service_id).u32(s.pipe_dir).u32(s.pipe_num);
            })
            .put_list(0x13, shadow.iter(), |b, s| {
                b.u32(s.addr).u32(s.value);
            });
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            host_version: r
                .opt_str(0x10, QMI_WLFW_MAX_STR_LEN)?
                .unwrap_or_default(),
            tgt_cfg: r
                .opt_list(0x11, QMI_WLFW_MAX_NUM_CE, |v| {
                    Ok(CePipeConfig {
                        pipe_num: v.u32()?,
                        pipe_dir: v.u32()?,
                        nentries: v.u32()?,
                        nbytes_max: v.u32()?,
                        flags: v.u32()?,
                    })
                })?
                .map(|(_, c)| c)
                .unwrap_or_default(),
            svc_cfg: r
                .opt_list(0x12, QMI_WLFW_MAX_NUM_SVC, |v| {
                    Ok(ServicePipeMap {
                        service_id: v.u32()?,
                        pipe_dir: v.u32()?,
                        pipe_num: v.u32()?,
                    })
                })?
                .map(|(_, s)| s)
                .unwrap_or_default(),
            shadow_reg_v2: r
                .opt_list(0x13, QMI_WLFW_MAX_NUM_SHADOW_REG_V2, |v| {
                    Ok(ShadowRegV2 {
                        addr: v.u32()?,
                        value: v.u32()?,
                    })
                })?
                .map(|(_, s)| s)
                .unwrap_or_default(),
        })
    }
}

status_response!(WlanCfgResp = QMI_WLFW_WLAN_CFG_REQ);
request!(WlanCfgReq => WlanCfgResp);

// ============================================================================
// Diagnostic register access
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AthdiagReadReq {
    pub offset: u32,
    pub mem_type: u32,
    pub data_len: u32,
}

impl QmiMessage for AthdiagReadReq {
    const MSG_ID: u16 = QMI_WLFW_ATHDIAG_READ_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.offset)
            .put_u32(0x02, self.mem_type)
            .put_u32(0x03, self.data_len);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            offset: r.req_u32(0x01)?,
            mem_type: r.req_u32(0x02)?,
            data_len: r.req_u32(0x03)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AthdiagReadResp {
    pub resp: ResponseStatus,
    pub data: Option<Vec<u8>>,
}

impl QmiMessage for AthdiagReadResp {
    const MSG_ID: u16 = QMI_WLFW_ATHDIAG_READ_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        if let Some(data) = &self.data {
            w.put_blob(0x10, data);
        }
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            data: r.opt_blob(0x10, QMI_WLFW_MAX_DATA_SIZE)?,
        })
    }
}

impl QmiResponse for AthdiagReadResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(AthdiagReadReq => AthdiagReadResp);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AthdiagWriteReq {
    pub offset: u32,
    pub mem_type: u32,
    pub data: Vec<u8>,
}

impl QmiMessage for AthdiagWriteReq {
    const MSG_ID: u16 = QMI_WLFW_ATHDIAG_WRITE_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.offset)
            .put_u32(0x02, self.mem_type)
            .put_blob(0x03, &self.data);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            offset: r.req_u32(0x01)?,
            mem_type: r.req_u32(0x02)?,
            data: r
                .opt_blob(0x03, QMI_WLFW_MAX_DATA_SIZE)?
                .ok_or(CodecError::MissingField { tag: 0x03 })?,
        })
    }
}

status_response!(AthdiagWriteResp = QMI_WLFW_ATHDIAG_WRITE_REQ);
request!(AthdiagWriteReq => AthdiagWriteResp);

// ============================================================================
// Firmware log / feature mask
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IniReq {
    pub enablefwlog: Option<bool>,
}

impl QmiMessage for IniReq {
    const MSG_ID: u16 = QMI_WLFW_INI_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_bool(0x10, self.enablefwlog);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            enablefwlog: r.opt_bool(0x10)?,
        })
    }
}

status_response!(IniResp = QMI_WLFW_INI_REQ);
request!(IniReq => IniResp);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicFeatureMaskReq {
    pub mask: Option<u64>,
}

impl QmiMessage for DynamicFeatureMaskReq {
    const MSG_ID: u16 = QMI_WLFW_DYNAMIC_FEATURE_MASK_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u64(0x10, self.mask);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            mask: r.opt_u64(0x10)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicFeatureMaskResp {
    pub resp: ResponseStatus,
    pub prev_mask: Option<u64>,
    pub curr_mask: Option<u64>,
}

impl QmiMessage for DynamicFeatureMaskResp {
    const MSG_ID: u16 = QMI_WLFW_DYNAMIC_FEATURE_MASK_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u64(0x10, self.prev_mask)
            .put_opt_u64(0x11, self.curr_mask);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            prev_mask: r.opt_u64(0x10)?,
            curr_mask: r.opt_u64(0x11)?,
        })
    }
}

impl QmiResponse for DynamicFeatureMaskResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(DynamicFeatureMaskReq => DynamicFeatureMaskResp);

// ============================================================================
// Antenna arbitration
// ============================================================================

empty_message!(AntennaSwitchReq = QMI_WLFW_ANTENNA_SWITCH_REQ);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AntennaSwitchResp {
    pub resp: ResponseStatus,
    pub antenna: Option<u64>,
}

impl QmiMessage for AntennaSwitchResp {
    const MSG_ID: u16 = QMI_WLFW_ANTENNA_SWITCH_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u64(0x10, self.antenna);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            antenna: r.opt_u64(0x10)?,
        })
    }
}

impl QmiResponse for AntennaSwitchResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(AntennaSwitchReq => AntennaSwitchResp);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AntennaGrantReq {
    pub grant: Option<u64>,
}

impl QmiMessage for AntennaGrantReq {
    const MSG_ID: u16 = QMI_WLFW_ANTENNA_GRANT_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u64(0x10, self.grant);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            grant: r.opt_u64(0x10)?,
        })
    }
}

status_response!(AntennaGrantResp = QMI_WLFW_ANTENNA_GRANT_REQ);
request!(AntennaGrantReq => AntennaGrantResp);

// ============================================================================
// M3 dump / device info
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct M3DumpUploadDoneReq {
    pub pdev_id: u32,
    pub status: u32,
}

impl QmiMessage for M3DumpUploadDoneReq {
    const MSG_ID: u16 = QMI_WLFW_M3_DUMP_UPLOAD_DONE_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.pdev_id).put_u32(0x02, self.status);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pdev_id: r.req_u32(0x01)?,
            status: r.req_u32(0x02)?,
        })
    }
}

status_response!(M3DumpUploadDoneResp = QMI_WLFW_M3_DUMP_UPLOAD_DONE_REQ);
request!(M3DumpUploadDoneReq => M3DumpUploadDoneResp);

empty_message!(DeviceInfoReq = QMI_WLFW_DEVICE_INFO_REQ);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceInfoResp {
    pub resp: ResponseStatus,
    pub bar_addr: Option<u64>,
    pub bar_size: Option<u32>,
}

impl QmiMessage for DeviceInfoResp {
    const MSG_ID: u16 = QMI_WLFW_DEVICE_INFO_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u64(0x10, self.bar_addr)
            .put_opt_u32(0x11, self.bar_size);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            bar_addr: r.opt_u64(0x10)?,
            bar_size: r.opt_u32(0x11)?,
        })
    }
}

impl QmiResponse for DeviceInfoResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(DeviceInfoReq => DeviceInfoResp);

// ============================================================================
// Multi-link reconfiguration / Wi-Fi calling relay
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MloReconfigInfoReq {
    pub topology: MloTopology,
}

impl QmiMessage for MloReconfigInfoReq {
    const MSG_ID: u16 = QMI_WLFW_MLO_RECONFIG_INFO_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.topology.encode_at(w, 0x10);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            topology: MloTopology::decode_at(r, 0x10)?.unwrap_or_default(),
        })
    }
}

status_response!(MloReconfigInfoResp = QMI_WLFW_MLO_RECONFIG_INFO_REQ);
request!(MloReconfigInfoReq => MloReconfigInfoResp);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WfcCallStatusReq {
    pub data: Vec<u8>,
}

impl QmiMessage for WfcCallStatusReq {
    const MSG_ID: u16 = QMI_WLFW_WFC_CALL_STATUS_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_blob(0x01, &self.data);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            data: r
                .opt_blob(0x01, MAX_BLOB_LEN)?
                .ok_or(CodecError::MissingField { tag: 0x01 })?,
        })
    }
}

status_response!(WfcCallStatusResp = QMI_WLFW_WFC_CALL_STATUS_REQ);
request!(WfcCallStatusReq => WfcCallStatusResp);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wlan_mode_rejects_unknown_value() {
        let mut w = TlvWriter::new();
        w.put_u32(0x01, 8);
        let bytes = w.into_bytes();
        assert_eq!(
            WlanModeReq::from_bytes(&bytes).unwrap_err(),
            CodecError::Malformed { tag: 0x01 }
        );
    }

    #[test]
    fn test_wlan_cfg_encode_clamps_lists() {
        let req = WlanCfgReq {
            host_version: "a-very-long-host-version".into(),
            tgt_cfg: vec![CePipeConfig::default(); QMI_WLFW_MAX_NUM_CE + 3],
            svc_cfg: vec![ServicePipeMap::default(); 2],
            shadow_reg_v2: vec![ShadowRegV2::default(); QMI_WLFW_MAX_NUM_SHADOW_REG_V2 + 1],
        };
        let decoded = WlanCfgReq::from_bytes(&req.to_bytes()).unwrap();
        assert_eq!(decoded.host_version.len(), QMI_WLFW_MAX_STR_LEN);
        assert_eq!(decoded.tgt_cfg.len(), QMI_WLFW_MAX_NUM_CE);
        assert_eq!(decoded.svc_cfg.len(), 2);
        assert_eq!(decoded.shadow_reg_v2.len(), QMI_WLFW_MAX_NUM_SHADOW_REG_V2);
    }

    #[test]
    fn test_athdiag_read_data_bound() {
        let resp = AthdiagReadResp {
            resp: ResponseStatus::SUCCESS,
            data: Some(vec![0u8; QMI_WLFW_MAX_DATA_SIZE + 1]),
        };
        assert!(matches!(
            AthdiagReadResp::from_bytes(&resp.to_bytes()),
            Err(CodecError::TooLong { tag: 0x10, .. })
        ));
    }
}
