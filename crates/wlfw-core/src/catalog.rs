//! Display names for message ids and peer instance ids.
//!
//! Tables are scanned in order and the first match wins. Two distinct ids
//! share the `CAL_UPDTE_` name; both entries are kept as they are.

use crate::protocol::constants::*;

pub const UNKNOWN_MSG_NAME: &str = "UNKNOWN_";
pub const UNKNOWN_DEVICE_NAME: &str = "UNKNOWN";

/// Message id to short name, in lookup order.
pub static MSG_NAMES: &[(u16, &str)] = &[
    (QMI_WLFW_SUBSYS_RESTART_LEVEL_REQ, "SYS_RSTRT_"),
    (QMI_WLFW_CAP_REQ, "TGT_CAP_"),
    (QMI_WLFW_CAL_REPORT_REQ, "CAL_RPRT_"),
    (QMI_WLFW_IND_REGISTER_REQ, "IND_REG_"),
    (QMI_WLFW_DYNAMIC_FEATURE_MASK_REQ, "DYN_MASK_"),
    (QMI_WLFW_AUX_UC_INFO_REQ, "AUX_UC_INFO_"),
    (QMI_WLFW_FW_READY_IND, "FW_RDY_"),
    (QMI_WLFW_CAL_UPDATE_REQ, "CAL_UPDTE_"),
    (QMI_WLFW_PHY_CAP_REQ, "PHY_CAP_"),
    (QMI_WLFW_REQUEST_MEM_IND, "FW_MEM_REQ_"),
    (QMI_WLFW_QDSS_TRACE_MODE_REQ, "QDSS_MODE_"),
    (QMI_WLFW_CAL_DOWNLOAD_REQ, "CAL_DNDL_"),
    (QMI_WLFW_M3_INFO_REQ, "M3_INFO_"),
    (QMI_WLFW_PCIE_GEN_SWITCH_REQ, "PCI_GEN_SWT_"),
    (QMI_WLFW_INITIATE_CAL_UPDATE_IND, "CAL_UPDTE_"),
    (QMI_WLFW_RESPOND_MEM_REQ, "MEM_INFO_"),
    (QMI_WLFW_MSA_READY_IND, "MSA_RDY_"),
    (QMI_WLFW_WLAN_MODE_REQ, "WLFW_MODE_"),
    (QMI_WLFW_REJUVENATE_IND, "REJUVNTE_"),
    (QMI_WLFW_ATHDIAG_WRITE_REQ, "ATHD_WRT_"),
    (QMI_WLFW_SOC_WAKE_REQ, "SOC_WAKE_"),
    (QMI_WLFW_PIN_CONNECT_RESULT_IND, "FW_PIN_RSLT_"),
    (QMI_WLFW_QDSS_TRACE_SAVE_IND, "QDSS_SAVE_"),
    (QMI_WLFW_SHUTDOWN_REQ, "SHUTDWN_"),
    (QMI_WLFW_VBATT_REQ, "VBATT_"),
    (QMI_WLFW_PCIE_LINK_CTRL_REQ, "PCI_LNK_CTRL_"),
    (QMI_WLFW_MAC_ADDR_REQ, "MAC_ADDR_"),
    (QMI_WLFW_WLAN_CFG_REQ, "WLAN_CFG_"),
    (QMI_WLFW_ANTENNA_GRANT_REQ, "ANT_GRNT_"),
    (QMI_WLFW_BDF_DOWNLOAD_REQ, "BDF_DNLD_"),
    (QMI_WLFW_FW_MEM_READY_IND, "FW_MEM_RDY_"),
    (QMI_WLFW_WLAN_HW_INIT_CFG_REQ, "HW_INIT_CFG_"),
    (QMI_WLFW_RESPOND_GET_INFO_IND, "RSPND_GET_INF_"),
    (QMI_WLFW_QDSS_TRACE_DATA_REQ, "QDSS_TRACE_"),
    (QMI_WLFW_QDSS_TRACE_MEM_INFO_REQ, "QDSS_MEM_INFO_"),
    (QMI_WLFW_ANTENNA_SWITCH_REQ, "ANT_SWT_"),
    (QMI_WLFW_QDSS_TRACE_REQ_MEM_IND, "QDSS_REQ_MEM_"),
    (QMI_WLFW_INITIATE_CAL_DOWNLOAD_IND, "INIT_CAL_DNLD_"),
    (QMI_WLFW_INI_REQ, "INI_MSG_"),
    (QMI_WLFW_M3_DUMP_UPLOAD_SEGMENTS_REQ_IND, "M3_DMP_UPLD_"),
    (QMI_WLFW_MSA_READY_REQ, "MSD_RDY_"),
    (QMI_WLFW_M3_DUMP_UPLOAD_DONE_REQ, "M3_DMP_UPLD_DONE_"),
    (QMI_WLFW_REJUVENATE_ACK_REQ, "REJUVNTE_ACK_"),
    (QMI_WLFW_DEVICE_INFO_REQ, "DEV_INF_"),
    (QMI_WLFW_MSA_INFO_REQ, "MSA_INF_"),
    (QMI_WLFW_HOST_CAP_REQ, "HOST_CAP_"),
    (QMI_WLFW_QDSS_TRACE_CONFIG_DOWNLOAD_REQ, "QDSS_CONF_DNLD_"),
    (QMI_WLFW_GET_INFO_REQ, "GET_INFO_"),
    (QMI_WLFW_CAL_DONE_IND, "CAL_DONE_"),
    (QMI_WLFW_M3_DUMP_UPLOAD_REQ_IND, "M3_DUMP_UPLD_REQ_"),
    (QMI_WLFW_FW_INIT_DONE_IND, "FW_INIT_DONE_"),
    (QMI_WLFW_POWER_SAVE_REQ, "PWR_SAVE_"),
    (QMI_WLFW_XO_CAL_IND, "X0_CAL_"),
    (QMI_WLFW_ATHDIAG_READ_REQ, "ATHD_READ_"),
    (QMI_WLFW_WFC_CALL_TWT_CONFIG_IND, "WFC_CALL_TWT_"),
    (QMI_WLFW_WFC_CALL_STATUS_REQ, "WFC_CALL_STAT_"),
    (QMI_WLFW_INI_FILE_DOWNLOAD_REQ, "INI_DNLD_"),
    (QMI_WLFW_QDSS_TRACE_FREE_IND, "QDSS_FREE_"),
    (QMI_WLFW_QDSS_MEM_READY_IND, "QDSS_MEM_RDY_"),
    (QMI_WLFW_MLO_RECONFIG_INFO_REQ, "MLO_WSI_REMAP_"),
];

/// Instance (or device) id to device name, in lookup order.
pub static DEVICE_NAMES: &[(u32, &str)] = &[
    (QCA8074_DEVICE_ID, "QCA8074"),
    (QCA8074V2_DEVICE_ID, "QCA8074V2"),
    (QCA6018_DEVICE_ID, "QCA6018"),
    (QCA5018_DEVICE_ID, "QCA5018"),
    (QCA9574_DEVICE_ID, "QCA9574"),
    (QCA5332_DEVICE_ID, "QCA5332"),
    (FW_ID_BASE + QCN9000_0, "QCN9000_0"),
    (FW_ID_BASE + QCN9000_0 + 1, "QCN9000_1"),
    (FW_ID_BASE + QCN9000_0 + 2, "QCN9000_2"),
    (FW_ID_BASE + QCN9000_0 + 3, "QCN9000_3"),
    (FW_ID_BASE + QCN9224_0, "QCN9224_0"),
    (FW_ID_BASE + QCN9224_0 + 1, "QCN9224_1"),
    (FW_ID_BASE + QCN9224_0 + 2, "QCN9224_2"),
    (FW_ID_BASE + QCN9224_0 + 3, "QCN9224_3"),
    (WLFW_SERVICE_INS_ID_QCN6122 + USERPD_0, "QCN6122_0"),
    (WLFW_SERVICE_INS_ID_QCN6122 + USERPD_1, "QCN6122_1"),
    (WLFW_SERVICE_INS_ID_QCN9160 + USERPD_0, "QCN9160_0"),
    (WLFW_SERVICE_INS_ID_QCN9160 + USERPD_1, "QCN9160_1"),
    (WLFW_SERVICE_INS_ID_QCN9160 + USERPD_2, "QCN9160_2"),
    (WLFW_SERVICE_INS_ID_QCN6432 + USERPD_0, "QCN6432_0"),
    (WLFW_SERVICE_INS_ID_QCN6432 + USERPD_1, "QCN6432_1"),
    (QCA5424_DEVICE_ID, "QCA5424"),
];

/// Short name for a message id. Direction bits are ignored.
pub fn msg_name(msg_id: u16) -> &'static str {
    let id = msg_id & 0xFF;
    MSG_NAMES
        .iter()
        .find(|(code, _)| *code == id)
        .map_or(UNKNOWN_MSG_NAME, |(_, name)| name)
}

/// Device name for a peer instance id.
pub fn device_name(instance_id: u32) -> &'static str {
    DEVICE_NAMES
        .iter()
        .find(|(id, _)| *id == instance_id)
        .map_or(UNKNOWN_DEVICE_NAME, |(_, name)| name)
}
