//! Indication dispatch.
//!
//! Every indication is recorded in the audit log on arrival. Handlers that
//! need a transaction context drop the indication without one. Heavy work
//! is never done here: handlers update peer state and post a `WorkItem`.

use tracing::{debug, info, warn};

use super::WlfwService;
use crate::catalog::msg_name;
use crate::events::LogLevel;
use crate::protocol::constants::*;
use crate::protocol::messages::*;
use crate::protocol::tlv::CodecError;
use crate::state::{DriverState, FwMemSegment};
use crate::transport::QmiTransport;
use crate::work::{CalStatus, QdssTraceEvent, WorkItem};

/// What a handler did with one indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicationOutcome {
    /// A work item was posted.
    Posted,
    /// Peer state was updated; nothing posted.
    Stored,
    /// Arrived without a transaction context.
    Spurious,
    /// Duplicate or filtered out.
    Dropped,
    /// Forwarded to the firmware.
    Relayed,
    /// Payload failed to decode.
    Malformed,
    /// No handler for this message id.
    Unknown,
}

/// Devices whose trace buffers are drained over the PCI-class path.
fn is_pci_class(device_id: u32) -> bool {
    matches!(
        device_id,
        QCN9000_DEVICE_ID
            | QCN6122_DEVICE_ID
            | QCN9160_DEVICE_ID
            | QCN9224_DEVICE_ID
            | QCA5332_DEVICE_ID
            | QCN6432_DEVICE_ID
            | QCA5424_DEVICE_ID
    )
}

fn is_legacy_ahb(device_id: u32) -> bool {
    matches!(
        device_id,
        QCA8074_DEVICE_ID
            | QCA8074V2_DEVICE_ID
            | QCA6018_DEVICE_ID
            | QCA5018_DEVICE_ID
            | QCA9574_DEVICE_ID
    )
}

impl<T: QmiTransport> WlfwService<T> {
    /// Route one indication to its handler.
    ///
    /// `txn` is the transaction context the channel delivered it with.
    pub fn handle_indication(&self, msg_id: u16, txn: Option<u16>, payload: &[u8]) -> IndicationOutcome {
        self.client.record(msg_id, 0, 0);

        let result = match msg_id {
            QMI_WLFW_REQUEST_MEM_IND => self.decode(payload).map(|ind| self.on_request_mem(txn, ind)),
            QMI_WLFW_FW_MEM_READY_IND => Ok(self.on_fw_mem_ready(txn)),
            QMI_WLFW_FW_READY_IND => Ok(self.on_fw_ready(txn)),
            QMI_WLFW_FW_INIT_DONE_IND => Ok(self.on_fw_init_done(txn)),
            QMI_WLFW_PIN_CONNECT_RESULT_IND => {
                self.decode(payload).map(|ind| self.on_pin_result(txn, ind))
            }
            QMI_WLFW_CAL_DONE_IND => self.decode(payload).map(|ind| self.on_cal_done(txn, ind)),
            QMI_WLFW_QDSS_TRACE_REQ_MEM_IND => {
                self.decode(payload).map(|ind| self.on_qdss_req_mem(txn, ind))
            }
            QMI_WLFW_QDSS_TRACE_SAVE_IND => self.decode(payload).map(|ind| self.on_qdss_save(txn, ind)),
            QMI_WLFW_QDSS_TRACE_FREE_IND => Ok(self.hand_off(WorkItem::QdssTraceFree)),
            QMI_WLFW_QDSS_MEM_READY_IND => Ok(self.hand_off(WorkItem::QdssMemReady)),
            QMI_WLFW_M3_DUMP_UPLOAD_REQ_IND => {
                self.decode(payload).map(|ind| self.on_m3_dump_req(txn, ind))
            }
            _ => {
                warn!(msg_id = format_args!("0x{:x}", msg_id), "Unhandled indication");
                self.log(LogLevel::Warn, format!("Unhandled indication 0x{:x}", msg_id));
                return IndicationOutcome::Unknown;
            }
        };

        result.unwrap_or_else(|e| {
            warn!(msg = msg_name(msg_id), "Dropping undecodable indication: {}", e);
            IndicationOutcome::Malformed
        })
    }

    fn decode<M: QmiMessage>(&self, payload: &[u8]) -> Result<M, CodecError> {
        M::from_bytes(payload)
    }

    fn spurious(&self, msg_id: u16) -> IndicationOutcome {
        warn!(msg = msg_name(msg_id), "Spurious indication");
        IndicationOutcome::Spurious
    }

    fn hand_off(&self, item: WorkItem) -> IndicationOutcome {
        self.post(item);
        IndicationOutcome::Posted
    }

    fn on_request_mem(&self, txn: Option<u16>, ind: RequestMemInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_REQUEST_MEM_IND);
        }
        if ind.declared_len == 0 || ind.declared_len > QMI_WLFW_MAX_NUM_MEM_SEG {
            warn!(count = ind.declared_len, "Invalid memory segment count");
            self.log(
                LogLevel::Warn,
                format!("Firmware requested {} memory segments", ind.declared_len),
            );
        }

        {
            let mut peer = self.peer();
            peer.fw_mem = ind
                .segments
                .iter()
                .map(|s| FwMemSegment {
                    mem_type: s.mem_type,
                    size: s.size,
                    ..Default::default()
                })
                .collect();
            peer.fw_mem_declared = ind.declared_len;
            peer.cal_mem = ind.segments.iter().position(|s| s.mem_type == CNSS_MEM_CAL);
            for (i, seg) in peer.fw_mem.iter().enumerate() {
                debug!(index = i, mem_type = seg.mem_type, size = seg.size, "Memory requested");
            }
        }
        self.hand_off(WorkItem::MemoryRequested)
    }

    fn on_fw_mem_ready(&self, txn: Option<u16>) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_FW_MEM_READY_IND);
        }
        {
            let mut peer = self.peer();
            if peer.flags.contains(DriverState::FW_MEM_READY) {
                drop(peer);
                warn!("FW memory ready indication received twice");
                return IndicationOutcome::Dropped;
            }
            peer.flags.insert(DriverState::FW_MEM_READY);
        }
        self.hand_off(WorkItem::FwMemReady)
    }

    fn on_fw_ready(&self, txn: Option<u16>) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_FW_READY_IND);
        }
        if self.flags().contains(DriverState::DAEMON_CONNECTED) {
            debug!("Daemon attached, calibration completion comes from it");
            return IndicationOutcome::Dropped;
        }
        self.hand_off(WorkItem::ColdBootCalDone {
            status: CalStatus::Done,
        })
    }

    fn on_fw_init_done(&self, txn: Option<u16>) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_FW_INIT_DONE_IND);
        }
        self.peer().flags.insert(DriverState::FW_READY);
        info!(instance = self.client.instance_id(), "Firmware init done");
        self.hand_off(WorkItem::FwReady)
    }

    fn on_pin_result(&self, txn: Option<u16>, ind: PinConnectResultInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_PIN_CONNECT_RESULT_IND);
        }
        let mut peer = self.peer();
        if let Some(v) = ind.pwr_pin_result {
            peer.pin_result.pwr_pin = Some(v);
        }
        if let Some(v) = ind.phy_io_pin_result {
            peer.pin_result.phy_io_pin = Some(v);
        }
        if let Some(v) = ind.rf_pin_result {
            peer.pin_result.rf_pin = Some(v);
        }
        debug!(pin_result = ?peer.pin_result, "Pin connect result");
        IndicationOutcome::Stored
    }

    fn on_cal_done(&self, txn: Option<u16>, ind: CalDoneInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_CAL_DONE_IND);
        }
        if let Some(size) = ind.cal_file_upload_size {
            self.peer().cal_file_upload_size = Some(size);
        }
        self.hand_off(WorkItem::ColdBootCalDone {
            status: CalStatus::Done,
        })
    }

    fn on_qdss_req_mem(&self, txn: Option<u16>, ind: QdssTraceReqMemInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_QDSS_TRACE_REQ_MEM_IND);
        }
        {
            let mut peer = self.peer();
            if !peer.qdss_mem.is_empty() {
                warn!(segments = peer.qdss_mem.len(), "Ignore double allocation");
            } else {
                if ind.segments.len() > 1 {
                    debug!(requested = ind.segments.len(), "Clamping QDSS segments to one");
                }
                peer.qdss_mem = ind
                    .segments
                    .iter()
                    .take(1)
                    .map(|s| FwMemSegment {
                        mem_type: s.mem_type,
                        size: s.size,
                        ..Default::default()
                    })
                    .collect();
            }
        }
        self.hand_off(WorkItem::QdssTraceReqMem)
    }

    fn on_qdss_save(&self, txn: Option<u16>, ind: QdssTraceSaveInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_QDSS_TRACE_SAVE_IND);
        }
        let device_id = self.config.device.device_id;
        let accepted = is_pci_class(device_id) || (is_legacy_ahb(device_id) && ind.source == 1);
        if !accepted {
            info!(
                device_id = format_args!("0x{:x}", device_id),
                source = ind.source,
                "QDSS trace save not supported"
            );
            return IndicationOutcome::Dropped;
        }

        let file_name = ind
            .file_name
            .unwrap_or_else(|| QDSS_DEFAULT_TRACE_FILE.to_string());
        if ind.source == 1 {
            return self.hand_off(WorkItem::QdssTraceReqData(QdssTraceEvent {
                total_size: ind.total_size,
                file_name,
                mem_seg: Vec::new(),
            }));
        }

        let (declared, segs) = ind.mem_seg.unwrap_or_default();
        if declared > QDSS_TRACE_SEG_LEN_MAX {
            warn!(count = declared, "Invalid QDSS trace segment count");
            return IndicationOutcome::Dropped;
        }
        self.hand_off(WorkItem::QdssTraceSave(QdssTraceEvent {
            total_size: ind.total_size,
            file_name,
            mem_seg: segs,
        }))
    }

    fn on_m3_dump_req(&self, txn: Option<u16>, ind: M3DumpUploadReqInd) -> IndicationOutcome {
        if txn.is_none() {
            return self.spurious(QMI_WLFW_M3_DUMP_UPLOAD_REQ_IND);
        }
        self.hand_off(WorkItem::M3DumpUploadReq {
            pdev_id: ind.pdev_id,
            addr: ind.addr,
            size: ind.size,
        })
    }
}
