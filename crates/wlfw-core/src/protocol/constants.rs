//! WLFW service constants: message identifiers, protocol limits, result
//! codes and device identities.

// ============================================================================
// Service identity
// ============================================================================

/// WLFW service id used for server lookup.
pub const WLFW_SERVICE_ID: u32 = 0x45;
/// WLFW service version.
pub const WLFW_SERVICE_VERS: u32 = 0x01;
/// Client id sent with indication registration ('KNEL').
pub const WLFW_CLIENT_ID: u32 = 0x4b4e_454c;

pub const COEX_SERVICE_ID: u32 = 0x22;
pub const IMS_PRIVATE_SERVICE_ID: u32 = 0x4D;

// ============================================================================
// Direction bits (audit log classification)
// ============================================================================

pub const QMI_TYPE_REQ: u16 = 0x100;
pub const QMI_TYPE_RESP: u16 = 0x300;
pub const QMI_TYPE_MASK: u16 = 0x300;

// ============================================================================
// Message identifiers (request and response share an id)
// ============================================================================

pub const QMI_WLFW_IND_REGISTER_REQ: u16 = 0x0020;
pub const QMI_WLFW_FW_READY_IND: u16 = 0x0021;
pub const QMI_WLFW_WLAN_MODE_REQ: u16 = 0x0022;
pub const QMI_WLFW_WLAN_CFG_REQ: u16 = 0x0023;
pub const QMI_WLFW_CAP_REQ: u16 = 0x0024;
pub const QMI_WLFW_BDF_DOWNLOAD_REQ: u16 = 0x0025;
pub const QMI_WLFW_CAL_REPORT_REQ: u16 = 0x0026;
pub const QMI_WLFW_CAL_DOWNLOAD_REQ: u16 = 0x0027;
pub const QMI_WLFW_INITIATE_CAL_DOWNLOAD_IND: u16 = 0x0028;
pub const QMI_WLFW_CAL_UPDATE_REQ: u16 = 0x0029;
pub const QMI_WLFW_INITIATE_CAL_UPDATE_IND: u16 = 0x002A;
pub const QMI_WLFW_MSA_READY_IND: u16 = 0x002B;
pub const QMI_WLFW_PIN_CONNECT_RESULT_IND: u16 = 0x002C;
pub const QMI_WLFW_MSA_INFO_REQ: u16 = 0x002D;
pub const QMI_WLFW_MSA_READY_REQ: u16 = 0x002E;
pub const QMI_WLFW_INI_REQ: u16 = 0x002F;
pub const QMI_WLFW_ATHDIAG_READ_REQ: u16 = 0x0030;
pub const QMI_WLFW_ATHDIAG_WRITE_REQ: u16 = 0x0031;
pub const QMI_WLFW_VBATT_REQ: u16 = 0x0032;
pub const QMI_WLFW_MAC_ADDR_REQ: u16 = 0x0033;
pub const QMI_WLFW_HOST_CAP_REQ: u16 = 0x0034;
pub const QMI_WLFW_REQUEST_MEM_IND: u16 = 0x0035;
pub const QMI_WLFW_RESPOND_MEM_REQ: u16 = 0x0036;
pub const QMI_WLFW_FW_MEM_READY_IND: u16 = 0x0037;
pub const QMI_WLFW_FW_INIT_DONE_IND: u16 = 0x0038;
pub const QMI_WLFW_REJUVENATE_IND: u16 = 0x0039;
pub const QMI_WLFW_REJUVENATE_ACK_REQ: u16 = 0x003A;
pub const QMI_WLFW_DYNAMIC_FEATURE_MASK_REQ: u16 = 0x003B;
pub const QMI_WLFW_M3_INFO_REQ: u16 = 0x003C;
pub const QMI_WLFW_XO_CAL_IND: u16 = 0x003D;
pub const QMI_WLFW_CAL_DONE_IND: u16 = 0x003E;
pub const QMI_WLFW_QDSS_TRACE_REQ_MEM_IND: u16 = 0x003F;
pub const QMI_WLFW_QDSS_TRACE_MEM_INFO_REQ: u16 = 0x0040;
pub const QMI_WLFW_QDSS_TRACE_SAVE_IND: u16 = 0x0041;
pub const QMI_WLFW_QDSS_TRACE_DATA_REQ: u16 = 0x0042;
pub const QMI_WLFW_SHUTDOWN_REQ: u16 = 0x0043;
pub const QMI_WLFW_QDSS_TRACE_CONFIG_DOWNLOAD_REQ: u16 = 0x0044;
pub const QMI_WLFW_QDSS_TRACE_MODE_REQ: u16 = 0x0045;
pub const QMI_WLFW_QDSS_TRACE_FREE_IND: u16 = 0x0046;
pub const QMI_WLFW_ANTENNA_SWITCH_REQ: u16 = 0x0047;
pub const QMI_WLFW_ANTENNA_GRANT_REQ: u16 = 0x0048;
pub const QMI_WLFW_WFC_CALL_STATUS_REQ: u16 = 0x0049;
pub const QMI_WLFW_GET_INFO_REQ: u16 = 0x004A;
pub const QMI_WLFW_RESPOND_GET_INFO_IND: u16 = 0x004B;
pub const QMI_WLFW_DEVICE_INFO_REQ: u16 = 0x004C;
pub const QMI_WLFW_M3_DUMP_UPLOAD_REQ_IND: u16 = 0x004D;
pub const QMI_WLFW_M3_DUMP_UPLOAD_DONE_REQ: u16 = 0x004E;
pub const QMI_WLFW_SOC_WAKE_REQ: u16 = 0x004F;
pub const QMI_WLFW_POWER_SAVE_REQ: u16 = 0x0050;
pub const QMI_WLFW_WFC_CALL_TWT_CONFIG_IND: u16 = 0x0051;
pub const QMI_WLFW_PCIE_GEN_SWITCH_REQ: u16 = 0x0053;
pub const QMI_WLFW_M3_DUMP_UPLOAD_SEGMENTS_REQ_IND: u16 = 0x0054;
pub const QMI_WLFW_SUBSYS_RESTART_LEVEL_REQ: u16 = 0x0055;
pub const QMI_WLFW_INI_FILE_DOWNLOAD_REQ: u16 = 0x0056;
pub const QMI_WLFW_PHY_CAP_REQ: u16 = 0x0057;
pub const QMI_WLFW_WLAN_HW_INIT_CFG_REQ: u16 = 0x0058;
pub const QMI_WLFW_QDSS_MEM_READY_IND: u16 = 0x0059;
pub const QMI_WLFW_PCIE_LINK_CTRL_REQ: u16 = 0x005A;
pub const QMI_WLFW_AUX_UC_INFO_REQ: u16 = 0x005B;
pub const QMI_WLFW_MLO_RECONFIG_INFO_REQ: u16 = 0x005C;

// COEX / IMS services
pub const QMI_COEX_SWITCH_ANTENNA_TO_WLAN_REQ: u16 = 0x0042;
pub const QMI_COEX_SWITCH_ANTENNA_TO_MDM_REQ: u16 = 0x0043;
pub const QMI_IMS_PRIVATE_SERVICE_SUBSCRIBE_FOR_INDICATIONS_REQ: u16 = 0x003E;
pub const QMI_IMS_PRIVATE_SERVICE_WFC_CALL_STATUS_IND: u16 = 0x0040;

// ============================================================================
// Limits
// ============================================================================

/// Largest data chunk carried by one streaming request.
pub const QMI_WLFW_MAX_DATA_SIZE: usize = 6144;
pub const QMI_WLFW_MAX_NUM_MEM_SEG: usize = 52;
pub const QMI_WLFW_MAX_NUM_GPIO: usize = 32;
pub const QMI_WLFW_MAX_PLATFORM_NAME_LEN: usize = 64;
pub const QMI_WLFW_MAX_STR_LEN: usize = 16;
pub const QMI_WLFW_MAX_NUM_CE: usize = 12;
pub const QMI_WLFW_MAX_NUM_SVC: usize = 24;
pub const QMI_WLFW_MAX_NUM_SHADOW_REG_V2: usize = 36;
pub const QMI_WLFW_MAX_DEV_MEM_NUM: usize = 4;
pub const QMI_WLFW_MAX_TIMESTAMP_LEN: usize = 32;
pub const QMI_WLFW_MAX_WFC_CALL_STATUS_DATA_SIZE: usize = 256;
pub const QMI_WLFW_MAX_NUM_MLO_CHIPS: usize = 3;
pub const QMI_WLFW_MAX_NUM_MLO_LINKS_PER_CHIP: usize = 2;
pub const QMI_WLFW_MAX_ADJ_MLO_CHIPS: usize = 2;
pub const QDSS_TRACE_SEG_LEN_MAX: usize = 32;
pub const QDSS_TRACE_FILE_NAME_MAX: usize = 16;
pub const MAX_BDF_FILE_NAME: usize = 64;
pub const PAGE_SIZE: u64 = 4096;

/// Default transaction timeout.
pub const QMI_WLFW_TIMEOUT_MS: u64 = 10_000;
pub const COEX_TIMEOUT_MS: u64 = 10_000;

/// BAR size the user-PD targets must report in device info.
pub const DEVICE_BAR_SIZE: u32 = 0x20_0000;

// ============================================================================
// Result codes
// ============================================================================

pub const QMI_RESULT_SUCCESS: u16 = 0;
pub const QMI_RESULT_FAILURE: u16 = 1;
pub const QMI_ERR_NONE: u16 = 0;
pub const QMI_ERR_INCOMPATIBLE_STATE: u16 = 0x5A;

/// `fw_status` bit reported by indication registration.
pub const QMI_WLFW_ALREADY_REGISTERED: u64 = 0x01;

// ============================================================================
// Memory / file types
// ============================================================================

/// Memory segment type reserved for calibration data.
pub const CNSS_MEM_CAL: u32 = 4;
pub const INI_CFG_FILE_TYPE: u32 = 0;

pub const QDSS_TRACE_OFF: u32 = 0;
pub const QDSS_TRACE_ON: u32 = 1;

pub const BDF_DNLD_METHOD_QMI: u32 = 0;
pub const BDF_DNLD_METHOD_DIRECT_COPY: u32 = 1;

pub const BDF_TYPE_GOLDEN: u8 = 0;
pub const BDF_TYPE_CALDATA: u8 = 2;
pub const BDF_TYPE_EEPROM: u8 = 3;
pub const BDF_TYPE_REGDB: u8 = 4;
pub const BDF_TYPE_HDS: u8 = 6;
pub const BDF_TYPE_RXGAINLUT: u8 = 7;

// ============================================================================
// File names
// ============================================================================

pub const FW_INI_CFG_FILE_NAME: &str = "firmware_rdp_feature.ini";
pub const DEFAULT_BDF_FILE_NAME: &str = "bdwlan.bin";
pub const BDF_FILE_NAME_PREFIX: &str = "bdwlan.b";
pub const DEFAULT_CAL_FILE_NAME: &str = "caldata.bin";
pub const CAL_FILE_PREFIX: &str = "caldata_";
pub const CAL_FILE_SUFFIX: &str = ".bin";
pub const DEFAULT_REGDB_FILE_NAME: &str = "regdb.bin";
pub const REGDB_FILE_NAME_PREFIX: &str = "regdb.b";
pub const HDS_FILE_NAME: &str = "hds.bin";
pub const DEFAULT_RXGAINLUT_FILE_NAME: &str = "rxgainlut.bin";
pub const RXGAINLUT_FILE_NAME_PREFIX: &str = "rxgainlut.b";
pub const QDSS_CONFIG_FILE_PREFIX: &str = "qdss_trace_config";
pub const QDSS_CONFIG_FILE_SUFFIX: &str = ".bin";
pub const QDSS_DEFAULT_TRACE_FILE: &str = "qdss_trace";

/// Mask removing the firmware-type nibble from a board-id override.
pub const FW_TYPE_MASK: u32 = 0xF000;

// ============================================================================
// Device identities
// ============================================================================

pub const QCA8074_DEVICE_ID: u32 = 0xFFFE;
pub const QCA8074V2_DEVICE_ID: u32 = 0xFFFF;
pub const QCA6018_DEVICE_ID: u32 = 0xFFFD;
pub const QCA5018_DEVICE_ID: u32 = 0xFFFC;
pub const QCA9574_DEVICE_ID: u32 = 0xFFFB;
pub const QCA5332_DEVICE_ID: u32 = 0xFFFA;
pub const QCN9000_DEVICE_ID: u32 = 0x1104;
pub const QCN9224_DEVICE_ID: u32 = 0x1109;
pub const QCN6122_DEVICE_ID: u32 = 0xFFF1;
pub const QCN9160_DEVICE_ID: u32 = 0xFFF8;
pub const QCN6432_DEVICE_ID: u32 = 0xFFF6;
pub const QCA5424_DEVICE_ID: u32 = 0xFFF5;

/// Instance id base for PCI targets.
pub const FW_ID_BASE: u32 = 7;
pub const QCN9000_0: u32 = 0;
pub const QCN9224_0: u32 = 4;

pub const USERPD_0: u32 = 1;
pub const USERPD_1: u32 = 2;
pub const USERPD_2: u32 = 3;

pub const WLFW_SERVICE_INS_ID_QCN6122: u32 = 0x20;
pub const WLFW_SERVICE_INS_ID_QCN9160: u32 = 0x30;
pub const WLFW_SERVICE_INS_ID_QCN6432: u32 = 0x40;
