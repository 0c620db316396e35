//! COEX antenna arbitration and IMS call-status messages.

use super::{QmiMessage, QmiResponse, ResponseStatus};
use crate::protocol::constants::*;
use crate::protocol::tlv::{CodecError, TlvReader, TlvWriter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoexSwitchAntennaToWlanReq {
    pub antenna: u64,
}

impl QmiMessage for CoexSwitchAntennaToWlanReq {
    const MSG_ID: u16 = QMI_COEX_SWITCH_ANTENNA_TO_WLAN_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u64(0x01, self.antenna);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            antenna: r.req_u64(0x01)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoexSwitchAntennaToWlanResp {
    pub resp: ResponseStatus,
    pub grant: Option<u64>,
}

impl QmiMessage for CoexSwitchAntennaToWlanResp {
    const MSG_ID: u16 = QMI_COEX_SWITCH_ANTENNA_TO_WLAN_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u64(0x10, self.grant);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            grant: r.opt_u64(0x10)?,
        })
    }
}

impl QmiResponse for CoexSwitchAntennaToWlanResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(CoexSwitchAntennaToWlanReq => CoexSwitchAntennaToWlanResp);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoexSwitchAntennaToMdmReq {
    pub antenna: u64,
}

impl QmiMessage for CoexSwitchAntennaToMdmReq {
    const MSG_ID: u16 = QMI_COEX_SWITCH_ANTENNA_TO_MDM_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u64(0x01, self.antenna);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            antenna: r.req_u64(0x01)?,
        })
    }
}

status_response!(CoexSwitchAntennaToMdmResp = QMI_COEX_SWITCH_ANTENNA_TO_MDM_REQ);
request!(CoexSwitchAntennaToMdmReq => CoexSwitchAntennaToMdmResp);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImsSubscribeReq {
    pub wfc_call_status: Option<bool>,
}

impl QmiMessage for ImsSubscribeReq {
    const MSG_ID: u16 = QMI_IMS_PRIVATE_SERVICE_SUBSCRIBE_FOR_INDICATIONS_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_opt_bool(0x10, self.wfc_call_status);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            wfc_call_status: r.opt_bool(0x10)?,
        })
    }
}

status_response!(ImsSubscribeResp = QMI_IMS_PRIVATE_SERVICE_SUBSCRIBE_FOR_INDICATIONS_REQ);
request!(ImsSubscribeReq => ImsSubscribeResp);

/// Wi-Fi calling status pushed by the IMS service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImsWfcCallStatusInd {
    pub wfc_call_active: bool,
    pub all_wfc_calls_held: Option<bool>,
    pub is_wfc_emergency: Option<bool>,
    pub twt_ims_start: Option<u64>,
    pub twt_ims_int: Option<u32>,
    pub media_quality: Option<u32>,
}

impl QmiMessage for ImsWfcCallStatusInd {
    const MSG_ID: u16 = QMI_IMS_PRIVATE_SERVICE_WFC_CALL_STATUS_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_bool(0x01, self.wfc_call_active)
            .put_opt_bool(0x10, self.all_wfc_calls_held)
            .put_opt_bool(0x11, self.is_wfc_emergency)
            .put_opt_u64(0x12, self.twt_ims_start)
            .put_opt_u32(0x13, self.twt_ims_int)
            .put_opt_u32(0x14, self.media_quality);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            wfc_call_active: r.req_u8(0x01)? != 0,
            all_wfc_calls_held: r.opt_bool(0x10)?,
            is_wfc_emergency: r.opt_bool(0x11)?,
            twt_ims_start: r.opt_u64(0x12)?,
            twt_ims_int: r.opt_u32(0x13)?,
            media_quality: r.opt_u32(0x14)?,
        })
    }
}
