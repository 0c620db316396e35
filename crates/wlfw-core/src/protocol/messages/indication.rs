//! Readiness, pin result, calibration and M3 dump indications.

use super::QmiMessage;
use crate::protocol::constants::*;
use crate::protocol::tlv::{CodecError, TlvReader, TlvWriter};

empty_message!(FwReadyInd = QMI_WLFW_FW_READY_IND);
empty_message!(FwMemReadyInd = QMI_WLFW_FW_MEM_READY_IND);
empty_message!(FwInitDoneInd = QMI_WLFW_FW_INIT_DONE_IND);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinConnectResultInd {
    pub pwr_pin_result: Option<u32>,
    pub phy_io_pin_result: Option<u32>,
    pub rf_pin_result: Option<u32>,
}

impl QmiMessage for PinConnectResultInd {
    const MSG_ID: u16 = QMI_WLFW_PIN_CONNECT_RESULT_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u32(0x10, self.pwr_pin_result)
            .put_opt_u32(0x11, self.phy_io_pin_result)
            .put_opt_u32(0x12, self.rf_pin_result);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pwr_pin_result: r.opt_u32(0x10)?,
            phy_io_pin_result: r.opt_u32(0x11)?,
            rf_pin_result: r.opt_u32(0x12)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalDoneInd {
    pub cal_file_upload_size: Option<u64>,
}

impl QmiMessage for CalDoneInd {
    const MSG_ID: u16 = QMI_WLFW_CAL_DONE_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_u64(0x10, self.cal_file_upload_size);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            cal_file_upload_size: r.opt_u64(0x10)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct M3DumpUploadReqInd {
    pub pdev_id: u32,
    pub addr: u64,
    pub size: u64,
}

impl QmiMessage for M3DumpUploadReqInd {
    const MSG_ID: u16 = QMI_WLFW_M3_DUMP_UPLOAD_REQ_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.pdev_id)
            .put_u64(0x02, self.addr)
            .put_u64(0x03, self.size);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            pdev_id: r.req_u32(0x01)?,
            addr: r.req_u64(0x02)?,
            size: r.req_u64(0x03)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_result_partial() {
        let ind = PinConnectResultInd {
            rf_pin_result: Some(0x3),
            ..Default::default()
        };
        let decoded = PinConnectResultInd::from_bytes(&ind.to_bytes()).unwrap();
        assert_eq!(decoded.pwr_pin_result, None);
        assert_eq!(decoded.rf_pin_result, Some(0x3));
    }

    #[test]
    fn test_m3_dump_req_requires_all_fields() {
        let mut w = TlvWriter::new();
        w.put_u32(0x01, 0).put_u64(0x02, 0x4000_0000);
        let bytes = w.into_bytes();
        assert_eq!(
            M3DumpUploadReqInd::from_bytes(&bytes).unwrap_err(),
            CodecError::MissingField { tag: 0x03 }
        );
    }
}
