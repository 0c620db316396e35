//! QDSS trace memory, mode, configuration and data messages.

use super::{MemSegGrant, MemSegRequest, QmiMessage, QmiResponse, ResponseStatus};
use crate::protocol::constants::*;
use crate::protocol::tlv::{CodecError, MAX_BLOB_LEN, TlvReader, TlvWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QdssTraceReqMemInd {
    pub segments: Vec<MemSegRequest>,
}

impl QmiMessage for QdssTraceReqMemInd {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_REQ_MEM_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_list(0x01, self.segments.iter(), |b, s| {
            b.u32(s.size).u32(s.mem_type);
        });
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let (_, segments) = r
            .opt_list(0x01, QMI_WLFW_MAX_NUM_MEM_SEG, |v| {
                Ok(MemSegRequest {
                    size: v.u32()?,
                    mem_type: v.u32()?,
                })
            })?
            .ok_or(CodecError::MissingField { tag: 0x01 })?;
        Ok(Self { segments })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QdssTraceMemInfoReq {
    pub segments: Vec<MemSegGrant>,
    pub end: Option<bool>,
}

impl QmiMessage for QdssTraceMemInfoReq {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_MEM_INFO_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        let segs = &self.segments[..self.segments.len().min(QMI_WLFW_MAX_NUM_MEM_SEG)];
        w.put_list(0x01, segs.iter(), |b, s| {
            b.u64(s.addr).u32(s.size).u32(s.mem_type);
        })
        .put_opt_bool(0x10, self.end);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let (_, segments) = r
            .opt_list(0x01, QMI_WLFW_MAX_NUM_MEM_SEG, |v| {
                Ok(MemSegGrant {
                    addr: v.u64()?,
                    size: v.u32()?,
                    mem_type: v.u32()?,
                })
            })?
            .ok_or(CodecError::MissingField { tag: 0x01 })?;
        Ok(Self {
            segments,
            end: r.opt_bool(0x10)?,
        })
    }
}

status_response!(QdssTraceMemInfoResp = QMI_WLFW_QDSS_TRACE_MEM_INFO_REQ);
request!(QdssTraceMemInfoReq => QdssTraceMemInfoResp);

/// Segment holding trace data the host should save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QdssTraceSeg {
    pub addr: u64,
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QdssTraceSaveInd {
    pub source: u32,
    pub total_size: u32,
    /// Declared count and the decoded entries.
    pub mem_seg: Option<(usize, Vec<QdssTraceSeg>)>,
    pub file_name: Option<String>,
}

impl QmiMessage for QdssTraceSaveInd {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_SAVE_IND;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.source).put_u32(0x02, self.total_size);
        if let Some((declared, segs)) = &self.mem_seg {
            w.field(0x10, |b| {
                b.u8(*declared as u8);
                for s in segs {
                    b.u64(s.addr).u32(s.size);
                }
            });
        }
        if let Some(name) = &self.file_name {
            w.put_str(0x11, name, QDSS_TRACE_FILE_NAME_MAX);
        }
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            source: r.req_u32(0x01)?,
            total_size: r.req_u32(0x02)?,
            mem_seg: r.opt_list(0x10, QDSS_TRACE_SEG_LEN_MAX, |v| {
                Ok(QdssTraceSeg {
                    addr: v.u64()?,
                    size: v.u32()?,
                })
            })?,
            file_name: r.opt_str(0x11, QDSS_TRACE_FILE_NAME_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QdssTraceDataReq {
    pub seg_id: u32,
}

impl QmiMessage for QdssTraceDataReq {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_DATA_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x01, self.seg_id);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            seg_id: r.req_u32(0x01)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QdssTraceDataResp {
    pub resp: ResponseStatus,
    pub total_size: Option<u32>,
    pub seg_id: Option<u32>,
    pub data: Option<Vec<u8>>,
    pub end: Option<bool>,
}

impl QmiMessage for QdssTraceDataResp {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_DATA_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        self.resp.encode(w);
        w.put_opt_u32(0x10, self.total_size)
            .put_opt_u32(0x11, self.seg_id);
        if let Some(data) = &self.data {
            w.put_blob(0x12, data);
        }
        w.put_opt_bool(0x13, self.end);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        // Length is checked by the upload loop, which reports a mismatch
        // rather than a framing error.
        Ok(Self {
            resp: ResponseStatus::decode(r)?,
            total_size: r.opt_u32(0x10)?,
            seg_id: r.opt_u32(0x11)?,
            data: r.opt_blob(0x12, MAX_BLOB_LEN)?,
            end: r.opt_bool(0x13)?,
        })
    }
}

impl QmiResponse for QdssTraceDataResp {
    fn status(&self) -> ResponseStatus {
        self.resp
    }
}

request!(QdssTraceDataReq => QdssTraceDataResp);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QdssTraceConfigDownloadReq {
    pub total_size: u32,
    pub seg_id: u32,
    pub data: Vec<u8>,
    pub end: bool,
}

impl QmiMessage for QdssTraceConfigDownloadReq {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_CONFIG_DOWNLOAD_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x10, self.total_size)
            .put_u32(0x11, self.seg_id)
            .put_blob(0x12, &self.data)
            .put_bool(0x13, self.end);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            total_size: r.opt_u32(0x10)?.unwrap_or_default(),
            seg_id: r.opt_u32(0x11)?.unwrap_or_default(),
            data: r.opt_blob(0x12, MAX_BLOB_LEN)?.unwrap_or_default(),
            end: r.opt_bool(0x13)?.unwrap_or_default(),
        })
    }
}

status_response!(QdssTraceConfigDownloadResp = QMI_WLFW_QDSS_TRACE_CONFIG_DOWNLOAD_REQ);
request!(QdssTraceConfigDownloadReq => QdssTraceConfigDownloadResp);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QdssTraceModeReq {
    pub mode: u32,
    pub option: Option<u64>,
}

impl QmiMessage for QdssTraceModeReq {
    const MSG_ID: u16 = QMI_WLFW_QDSS_TRACE_MODE_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u32(0x10, self.mode).put_opt_u64(0x11, self.option);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            mode: r.opt_u32(0x10)?.unwrap_or_default(),
            option: r.opt_u64(0x11)?,
        })
    }
}

status_response!(QdssTraceModeResp = QMI_WLFW_QDSS_TRACE_MODE_REQ);
request!(QdssTraceModeReq => QdssTraceModeResp);

empty_message!(QdssTraceFreeInd = QMI_WLFW_QDSS_TRACE_FREE_IND);
empty_message!(QdssMemReadyInd = QMI_WLFW_QDSS_MEM_READY_IND);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_ind_reports_declared_segment_count() {
        let ind = QdssTraceSaveInd {
            source: 0,
            total_size: 0x1000,
            mem_seg: Some((40, vec![QdssTraceSeg::default(); QDSS_TRACE_SEG_LEN_MAX])),
            file_name: None,
        };
        let decoded = QdssTraceSaveInd::from_bytes(&ind.to_bytes()).unwrap();
        let (declared, segs) = decoded.mem_seg.unwrap();
        assert_eq!(declared, 40);
        assert_eq!(segs.len(), QDSS_TRACE_SEG_LEN_MAX);
        assert_eq!(decoded.file_name, None);
    }

    #[test]
    fn test_save_ind_file_name_cut() {
        let ind = QdssTraceSaveInd {
            source: 1,
            total_size: 64,
            mem_seg: None,
            file_name: Some("a_rather_long_trace_name".into()),
        };
        let decoded = QdssTraceSaveInd::from_bytes(&ind.to_bytes()).unwrap();
        assert_eq!(
            decoded.file_name.as_deref(),
            Some("a_rather_long_tr")
        );
    }

    #[test]
    fn test_mem_info_end_flag_optional() {
        let req = QdssTraceMemInfoReq {
            segments: vec![MemSegGrant {
                addr: 0x8000_0000,
                size: 4096,
                mem_type: 3,
            }],
            end: None,
        };
        let decoded = QdssTraceMemInfoReq::from_bytes(&req.to_bytes()).unwrap();
        assert_eq!(decoded, req);
    }
}
