//! Memory hand-off, board-data download, M3 and calibration report messages.

use super::QmiMessage;
use crate::protocol::constants::*;
use crate::protocol::tlv::{CodecError, MAX_BLOB_LEN, TlvReader, TlvWriter};

// ============================================================================
// Memory request / response
// ============================================================================

/// One segment as requested by the firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemSegRequest {
    pub size: u32,
    pub mem_type: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMemInd {
    /// Count as declared by the firmware, before clamping.
    pub declared_len: usize,
    /// At most `QMI_WLFW_MAX_NUM_MEM_SEG` entries.
    pub segments: Vec<MemSegRequest>,
}

impl QmiMessage for RequestMemInd {
    const MSG_ID: u16 = QMI_WLFW_REQUEST_MEM_IND;

    fn encode(&self, w: &mut TlvWriter) {
        // The declared count is written as-is so malformed requests can be
        // reproduced.
        w.field(0x01, |b| {
            b.u8(self.declared_len as u8);
            for seg in &self.segments {
                b.u32(seg.size).u32(seg.mem_type);
            }
        });
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        let (declared_len, segments) = r
            .opt_list(0x01, QMI_WLFW_MAX_NUM_MEM_SEG, |v| {
                Ok(MemSegRequest {
                    size: v.u32()?,
                    mem_type: v.u32()?,
                })
            })?
            .ok_or(CodecError::MissingField { tag: 0x01 })?;
        Ok(Self {
            declared_len,
            segments,
        })
    }
}

/// One granted segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemSegGrant {
    pub addr: u64,
    pub size: u32,
    pub mem_type: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespondMemReq {
    pub segments: Vec<MemSegGrant>,
}

impl QmiMessage for RespondMemReq {
    const MSG_ID: u16 = QMI_WLFW_RESPOND_MEM_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        let segs = &self.segments[..self.segments.len().min(QMI_WLFW_MAX_NUM_MEM_SEG)];
        w.put_list(0x01, segs.iter(), |b, s| {
            b.u64(s.addr).u32(s.size).u32(s.mem_type);
        });
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
        Ok(Self { segments })
    }
}

status_response!(RespondMemResp = QMI_WLFW_RESPOND_MEM_REQ);
request!(RespondMemReq => RespondMemResp);

// ============================================================================
// Board data download
// ============================================================================

/// One round of a board-data, calibration, RegDB, HDS or RX-gain-LUT
/// transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BdfDownloadReq {
    pub valid: bool,
    pub file_id: u32,
    pub total_size: u32,
    pub seg_id: u32,
    pub data: Vec<u8>,
    pub end: bool,
    pub bdf_type: u8,
}

impl QmiMessage for BdfDownloadReq {
    const MSG_ID: u16 = QMI_WLFW_BDF_DOWNLOAD_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_bool(0x01, self.valid)
            .put_u32(0x10, self.file_id)
            .put_u32(0x11, self.total_size)
            .put_u32(0x12, self.seg_id)
            .put_blob(0x13, &self.data)
            .put_bool(0x14, self.end)
            .put_u8(0x15, self.bdf_type);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            valid: r.req_u8(0x01)? != 0,
            file_id: r.opt_u32(0x10)?.unwrap_or_default(),
            total_size: r.opt_u32(0x11)?.unwrap_or_default(),
            seg_id: r.opt_u32(0x12)?.unwrap_or_default(),
            data: r.opt_blob(0x13, MAX_BLOB_LEN)?.unwrap_or_default(),
            end: r.opt_bool(0x14)?.unwrap_or_default(),
            bdf_type: r.opt_u8(0x15)?.unwrap_or_default(),
        })
    }
}

status_response!(BdfDownloadResp = QMI_WLFW_BDF_DOWNLOAD_REQ);
request!(BdfDownloadReq => BdfDownloadResp);

// ============================================================================
// M3 region
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct M3InfoReq {
    pub addr: u64,
    pub size: u32,
}

impl QmiMessage for M3InfoReq {
    const MSG_ID: u16 = QMI_WLFW_M3_INFO_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        w.put_u64(0x01, self.addr).put_u32(0x02, self.size);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            addr: r.req_u64(0x01)?,
            size: r.req_u32(0x02)?,
        })
    }
}

status_response!(M3InfoResp = QMI_WLFW_M3_INFO_REQ);
request!(M3InfoReq => M3InfoResp);

// ============================================================================
// Calibration report (legacy)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalReportReq {
    pub cal_file_download_size: Option<u32>,
}

impl QmiMessage for CalReportReq {
    const MSG_ID: u16 = QMI_WLFW_CAL_REPORT_REQ;

    fn encode(&self, w: &mut TlvWriter) {
        // Mandatory, always-empty calibration id list.
        w.put_list(0x01, std::iter::empty::<u8>(), |_, _| {});
        w.put_opt_u32(0x10, self.cal_file_download_size);
    }

    fn decode(r: &TlvReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            cal_file_download_size: r.opt_u32(0x10)?,
        })
    }
}

status_response!(CalReportResp = QMI_WLFW_CAL_REPORT_REQ);
request!(CalReportReq => CalReportResp);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_mem_keeps_declared_count() {
        let ind = RequestMemInd {
            declared_len: 60,
            segments: vec![
                MemSegRequest {
                    size: 4096,
                    mem_type: 1
                };
                QMI_WLFW_MAX_NUM_MEM_SEG
            ],
        };
        let decoded = RequestMemInd::from_bytes(&ind.to_bytes()).unwrap();
        assert_eq!(decoded.declared_len, 60);
        assert_eq!(decoded.segments.len(), QMI_WLFW_MAX_NUM_MEM_SEG);
    }

    #[test]
    fn test_request_mem_requires_segment_list() {
        assert_eq!(
            RequestMemInd::from_bytes(&[]).unwrap_err(),
            CodecError::MissingField { tag: 0x01 }
        );
    }

    #[test]
    fn test_bdf_request_layout() {
        let req = BdfDownloadReq {
            valid: true,
            file_id: 0xFF,
            total_size: 3,
            seg_id: 0,
            data: vec![1, 2, 3],
            end: true,
            bdf_type: BDF_TYPE_CALDATA,
        };
        let bytes = req.to_bytes();
        assert_eq!(&bytes[..4], &[0x01, 0x01, 0x00, 0x01]);
        assert_eq!(BdfDownloadReq::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn test_respond_mem_clamps_segments() {
        let req = RespondMemReq {
            segments: vec![MemSegGrant::default(); QMI_WLFW_MAX_NUM_MEM_SEG + 4],
        };
        let decoded = RespondMemReq::from_bytes(&req.to_bytes()).unwrap();
        assert_eq!(decoded.segments.len(), QMI_WLFW_MAX_NUM_MEM_SEG);
    }
}
