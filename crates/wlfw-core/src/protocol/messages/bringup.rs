//! Registration, capability and INI download messages.

use serde::{Deserialize, Serialize};

use super::{QmiMessage, QmiResponse, ResponseStatus};
use crate::protocol::constants::*;
use crate::protocol::tlv::{
    CodecError, MAX_BLOB_LEN, TlvReader, TlvWriter, ValueBuilder, ValueReader,
};

// ============================================================================
// Indication registration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndRegisterReq {
    pub client_id: Option<u32>,
    pub fw_ready_enable: Option<bool>,
    pub request_mem_enable: Option<bool>,
    pub fw_mem_ready_enable: Option<bool>,
    pub fw_init_done_enable: Option<bool>,
    pub pin_connect_result_enable: Option<bool>,
    pub cal_done_enable: Option<bool>,
    pub qdss_trace_req_mem_enable: Option<bool>,
    pub qdss_trace_save_enable: Option<bool>,
    pub qdss_trace_free_enable: Option<bool>,
    pub m3_dump_upload_req_enable: Option<bool>,
    pub qdss_mem_ready_enable: Option<bool>,
}

impl IndRegisterReq {
    /// The indication classes the host always subscribes to.
    pub fn host_default() -> Self {
        Self {
            client_id: Some(WLFW_CLIENT_ID),
            fw_ready_enable: Some(true),
            request_mem_enable: Some(true),
            fw_mem_ready_enable: Some(true),
            fw_init_done_enable: Some(true),
            pin_connect_result_enable: None,
            cal_done_enable: Some(true),
            qdss_trace_req_mem_enable: Some(true),
            qdss_trace_save_enable: Some(true),
            qdss_trace_free_enable: Some(true),
            m3_dump_upload_req_enable: Some(true),
            qdss_mem_ready_enable: Some(true),
        }
    }
}

impl QmiMessage for IndRegisterReq {
    const MSG_ID: u16 = QMI_WLFW_IND_REGISTER_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u32(0x10, self.client_id)
            .put_opt_bool(0x11, self.fw_ready_enable)
            .put_opt_bool(0x12, self.request_mem_enable)
            .put_opt_bool(0x13, self.fw_mem_ready_enable)
            .put_opt_bool(0x14, self.fw_init_done_enable)
            .put_opt_bool(0x15, self.pin_connect_result_enable)
            .put_opt_bool(0x16, self.cal_done_enable)
            .put_opt_bool(0x17, self.qdss_trace_req_mem_enable)
            .put_opt_bool(0x18, self.qdss_trace_save_enable)
            .put_opt_bool(0x19, self.qdss_trace_free_enable)
            .put_opt_bool(0x1A, self.m3_dump_upload_req_enable)
            .put_opt_bool(0x1B, self.qdss_mem_ready_enable);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            client_id: r.opt_u32(0x10)?,
            fw_ready_enable: r.opt_bool(0x11)?,
            request_mem_enable: r.opt_bool(0x12)?,
            fw_mem_ready_enable: r.opt_bool(0x13)?,
            fw_init_done_enable: r.opt_bool(0x14)?,
            pin_connect_result_enable: r.opt_bool(0x15)?,
            cal_done_enable: r.opt_bool(0x16)?,
            qdss_trace_req_mem_enable: r.opt_bool(0x17)?,
            qdss_trace_save_enable: r.opt_bool(0x18)?,
            qdss_trace_free_enable: r.opt_bool(0x19)?,
            m3_dump_upload_req_enable: r.opt_bool(0x1A)?,
            qdss_mem_ready_enable: r.opt_bool(0x1B)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndRegisterResp {
    pub resp: ResponseStatus,
    pub fw_status: Option<u64>,
}

impl IndRegisterResp {
    pub fn already_registered(&self) -> bool {
        self.fw_status
            .is_some_and(|s| s & QMI_WLFW_ALREADY_REGISTERED != 0)
    }
}

impl QmiMessage for IndRegisterResp {
    const MSG_ID: u16 = QMI_WLFW_IND_REGISTER_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u64(0x10, self.fw_status);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            fw_status: r.opt_u64(0x10)?,
        })
    }
}

impl QmiResponse for IndRegisterResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(IndRegisterReq => IndRegisterResp);

// ============================================================================
// Multi-link topology
// ============================================================================

/// Per-chip link description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MloChipInfo {
    pub chip_id: u8,
    pub num_local_links: u8,
    pub hw_link_ids: [u8; QMI_WLFW_MAX_NUM_MLO_LINKS_PER_CHIP],
    pub valid_link_ids: [u8; QMI_WLFW_MAX_NUM_MLO_LINKS_PER_CHIP],
}

impl MloChipInfo {
    fn write(&self, b: &mut ValueBuilder) {
        b.u8(self.chip_id).u8(self.num_local_links);
        for id in self.hw_link_ids {
            b.u8(id);
        }
        for id in self.valid_link_ids {
            b.u8(id);
        }
    }

    fn read(v: &mut ValueReader<'_>) -> Result<Self, CodecError> {
        let chip_id = v.u8()?;
        let num_local_links = v.u8()?;
        let mut hw_link_ids = [0u8; QMI_WLFW_MAX_NUM_MLO_LINKS_PER_CHIP];
        for id in hw_link_ids.iter_mut() {
            *id = v.u8()?;
        }
        let mut valid_link_ids = [0u8; QMI_WLFW_MAX_NUM_MLO_LINKS_PER_CHIP];
        for id in valid_link_ids.iter_mut() {
            *id = v.u8()?;
        }
        Ok(Self {
            chip_id,
            num_local_links,
            hw_link_ids,
            valid_link_ids,
        })
    }
}

/// One chip of the group together with its adjacent chips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MloChipV2Info {
    pub chip: MloChipInfo,
    #[serde(default)]
    pub adjacent: Vec<MloChipInfo>,
}

/// Multi-link group description sent in host capabilities and on remap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MloTopology {
    pub chip_id: u8,
    pub group_id: u8,
    pub max_num_peers: u16,
    #[serde(default)]
    pub chips: Vec<MloChipV2Info>,
}

impl MloTopology {
    /// Writes the topology starting at `base`, using six consecutive tags.
    pub(crate) fn encode_at(&self, w: &mut TlvWriter, base: u8) {
        let chips = &self.chips[..self.chips.len().min(QMI_WLFW_MAX_NUM_MLO_CHIPS)];
        w.put_bool(base, true)
            .put_u8(base + 1, self.chip_id)
            .put_u8(base + 2, self.group_id)
            .put_u16(base + 3, self.max_num_peers)
            .put_u8(base + 4, chips.len() as u8)
            .put_list(base + 5, chips.iter(), |b, c| {
                c.chip.write(b);
                let adj = &c.adjacent[..c.adjacent.len().min(QMI_WLFW_MAX_ADJ_MLO_CHIPS)];
                b.u8(adj.len() as u8);
                for a in adj {
                    a.write(b);
                }
            });
    }

    pub(crate) fn decode_at(r: &TlvReader<'_>, base: u8) -> Result<Option<Self>, CodecError> {
        if r.opt_bool(base)? != Some(true) {
            return Ok(None);
        }
        let chips = r
            .opt_list(base + 5, QMI_WLFW_MAX_NUM_MLO_CHIPS, |v| {
                let chip = MloChipInfo::read(v)?;
                let n = v.u8()? as usize;
                let mut adjacent = Vec::with_capacity(n);
                for _ in 0..n.min(QMI_WLFW_MAX_ADJ_MLO_CHIPS) {
                    adjacent.push(MloChipInfo::read(v)?);
                }
                Ok(MloChipV2Info { chip, adjacent })
            })?
            .map(|(_, c)| c)
            .unwrap_or_default();
        Ok(Some(Self {
            chip_id: r.opt_u8(base + 1)?.unwrap_or_default(),
            group_id: r.opt_u8(base + 2)?.unwrap_or_default(),
            max_num_peers: r.opt_u16(base + 3)?.unwrap_or_default(),
            chips,
        }))
    }
}

// ============================================================================
// Host capabilities
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCapReq {
    pub num_clients: Option<u32>,
    pub fw_ini_cfg_support: Option<bool>,
    pub mem_cfg_mode: Option<u8>,
    pub bdf_support: Option<bool>,
    pub cal_done: Option<bool>,
    pub platform_name: Option<String>,
    pub gpios: Option<Vec<u32>>,
    pub mlo: Option<MloTopology>,
    pub num_wlan_clients: Option<u16>,
    pub num_wlan_vaps: Option<u8>,
}

impl QmiMessage for HostCapReq {
    const MSG_ID: u16 = QMI_WLFW_HOST_CAP_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u32(0x10, self.num_clients)
            .put_opt_bool(0x11, self.fw_ini_cfg_support)
            .put_opt_u8(0x12, self.mem_cfg_mode)
            .put_opt_bool(0x13, self.bdf_support)
            .put_opt_bool(0x14, self.cal_done);
        if let Some(name) = &self.platform_name {
            w.put_str(0x15, name, QMI_WLFW_MAX_PLATFORM_NAME_LEN);
        }
        if let Some(gpios) = &self.gpios {
            w.put_list(0x16, gpios.iter(), |b, g| {
                b.u32(*g);
            });
        }
        if let Some(mlo) = &self.mlo {
            mlo.encode_at(w, 0x17);
        }
        w.put_opt_u16(0x1D, self.num_wlan_clients)
            .put_opt_u8(0x1E, self.num_wlan_vaps);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            num_clients: r.opt_u32(0x10)?,
            fw_ini_cfg_support: r.opt_bool(0x11)?,
            mem_cfg_mode: r.opt_u8(0x12)?,
            bdf_support: r.opt_bool(0x13)?,
            cal_done: r.opt_bool(0x14)?,
            platform_name: r.opt_str(0x15, QMI_WLFW_MAX_PLATFORM_NAME_LEN)?,
            gpios: r
                .opt_list(0x16, QMI_WLFW_MAX_NUM_GPIO, |v| v.u32())?
                .map(|(_, g)| g),
            mlo: MloTopology::decode_at(r, 0x17)?,
            num_wlan_clients: r.opt_u16(0x1D)?,
            num_wlan_vaps: r.opt_u8(0x1E)?,
        })
    }
}

status_response!(HostCapResp = QMI_WLFW_HOST_CAP_REQ);
request!(HostCapReq => HostCapResp);

// ============================================================================
// Target capabilities
// ============================================================================

empty_message!(CapReq = QMI_WLFW_CAP_REQ);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevMemInfo {
    pub start: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapResp {
    pub resp: ResponseStatus,
    /// `(chip_id, chip_family)`
    pub chip_info: Option<(u32, u32)>,
    pub board_id: Option<u32>,
    pub soc_id: Option<u32>,
    /// `(fw_version, build_timestamp)`
    pub fw_version_info: Option<(u32, String)>,
    pub time_freq_hz: Option<u32>,
    pub otp_version: Option<u32>,
    pub eeprom_caldata_read_timeout: Option<u32>,
    pub dev_mem_info: Option<Vec<DevMemInfo>>,
    pub bdf_dnld_method: Option<u8>,
    pub regdb_mandatory: Option<bool>,
    pub rxgainlut_support: Option<bool>,
}

impl QmiMessage for CapResp {
    const MSG_ID: u16 = QMI_WLFW_CAP_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        if let Some((chip_id, family)) = self.chip_info {
            w.field(0x10, |b| {
                b.u32(chip_id).u32(family);
            });
        }
        w.put_opt_u32(0x11, self.board_id)
            .put_opt_u32(0x12, self.soc_id);
        if let Some((version, stamp)) = &self.fw_version_info {
            w.field(0x13, |b| {
                b.u32(*version)
                    .fixed_str(stamp, QMI_WLFW_MAX_TIMESTAMP_LEN + 1);
            });
        }
        w.put_opt_u32(0x14, self.time_freq_hz)
            .put_opt_u32(0x15, self.otp_version)
            .put_opt_u32(0x16, self.eeprom_caldata_read_timeout);
        if let Some(mem) = &self.dev_mem_info {
            w.put_list(0x17, mem.iter(), |b, m| {
                b.u64(m.start).u64(m.size);
            });
        }
        w.put_opt_u8(0x18, self.bdf_dnld_method)
            .put_opt_bool(0x19, self.regdb_mandatory)
            .put_opt_bool(0x1A, self.rxgainlut_support);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let chip_info = match r.value(0x10) {
            Some(mut v) => Some((v.u32()?, v.u32()?)),
            None => None,
        };
        let fw_version_info = match r.value(0x13) {
            Some(mut v) => Some((v.u32()?, v.fixed_str(QMI_WLFW_MAX_TIMESTAMP_LEN + 1)?)),
            None => None,
        };
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            chip_info,
            board_id: r.opt_u32(0x11)?,
            soc_id: r.opt_u32(0x12)?,
            fw_version_info,
            time_freq_hz: r.opt_u32(0x14)?,
            otp_version: r.opt_u32(0x15)?,
            eeprom_caldata_read_timeout: r.opt_u32(0x16)?,
            dev_mem_info: r
                .opt_list(0x17, QMI_WLFW_MAX_DEV_MEM_NUM, |v| {
                    Ok(DevMemInfo {
                        start: v.u64()?,
                        size: v.u64()?,
                    })
                })?
                .map(|(_, m)| m),
            bdf_dnld_method: r.opt_u8(0x18)?,
            regdb_mandatory: r.opt_bool(0x19)?,
            rxgainlut_support: r.opt_bool(0x1A)?,
        })
    }
}

impl QmiResponse for CapResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(CapReq => CapResp);

// ============================================================================
// INI file download
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFileDownloadReq {
    pub file_type: u32,
    pub total_size: u32,
    pub seg_id: u32,
    pub data: Vec<u8>,
    pub end: bool,
}

impl QmiMessage for IniFileDownloadReq {
    const MSG_ID: u16 = QMI_WLFW_INI_FILE_DOWNLOAD_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x10, self.file_type)
            .put_u32(0x11, self.total_size)
            .put_u32(0x12, self.seg_id)
            .put_blob(0x13, &self.data)
            .put_bool(0x14, self.end);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            file_type: r.opt_u32(0x10)?.unwrap_or_default(),
            total_size: r.opt_u32(0x11)?.unwrap_or_default(),
            seg_id: r.opt_u32(0x12)?.unwrap_or_default(),
            data: r
                .opt_blob(0x13, MAX_BLOB_LEN)?
                .unwrap_or_default(),
            end: r.opt_bool(0x14)?.unwrap_or_default(),
        })
    }
}

status_response!(IniFileDownloadResp = QMI_WLFW_INI_FILE_DOWNLOAD_REQ);
request!(IniFileDownloadReq => IniFileDownloadResp);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_bit() {
        let resp = IndRegisterResp {
            resp: ResponseStatus::SUCCESS,
            fw_status: Some(QMI_WLFW_ALREADY_REGISTERED),
        };
        let decoded = IndRegisterResp::from_bytes(&resp.to_bytes()).unwrap();
        assert!(decoded.already_registered());
        assert!(!IndRegisterResp::default().already_registered());
    }

    #[test]
    fn test_cap_resp_without_board_info() {
        let resp = CapResp {
            resp: ResponseStatus::SUCCESS,
            chip_info: Some((0x2, 0x4001)),
            ..Default::default()
        };
        let decoded = CapResp::from_bytes(&resp.to_bytes()).unwrap();
        assert_eq!(decoded.board_id, None);
        assert_eq!(decoded.chip_info, Some((0x2, 0x4001)));
    }

    #[test]
    fn test_cap_resp_timestamp_is_trimmed() {
        let resp = CapResp {
            resp: ResponseStatus::SUCCESS,
            fw_version_info: Some((0x1234, "2024-01-02 03:04".into())),
            ..Default::default()
        };
        let decoded = CapResp::from_bytes(&resp.to_bytes()).unwrap();
        assert_eq!(
            decoded.fw_version_info,
            Some((0x1234, "2024-01-02 03:04".to_string()))
        );
    }

    #[test]
    fn test_host_cap_mlo_fields() {
        let req = HostCapReq {
            num_clients: Some(1),
            mlo: Some(MloTopology {
                chip_id: 1,
                group_id: 0,
                max_num_peers: 128,
                chips: vec![MloChipV2Info {
                    chip: MloChipInfo {
                        chip_id: 1,
                        num_local_links: 2,
                        hw_link_ids: [0, 1],
                        valid_link_ids: [1, 1],
                    },
                    adjacent: vec![MloChipInfo {
                        chip_id: 2,
                        ..Default::default()
                    }],
                }],
            }),
            ..Default::default()
        };
        let decoded = HostCapReq::from_bytes(&req.to_bytes()).unwrap();
        assert_eq!(decoded, req);
    }
}
