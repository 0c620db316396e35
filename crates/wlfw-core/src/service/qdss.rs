//! QDSS trace subchannel: trace memory, configuration download, mode
//! toggling and trace upload.

use tracing::{debug, info, instrument, warn};

use super::{MemoryReserver, WlfwService};
use crate::blob::BlobError;
use crate::chunk::stream_download;
use crate::error::{Result, WlfwError};
use crate::events::LogLevel;
use crate::fault::FaultScope;
use crate::protocol::constants::*;
use crate::protocol::messages::{
    MemSegGrant, QdssTraceConfigDownloadReq, QdssTraceDataReq, QdssTraceMemInfoReq,
    QdssTraceModeReq,
};
use crate::state::DriverState;
use crate::transport::QmiTransport;
use crate::txn::CallOptions;

impl<T: QmiTransport> WlfwService<T> {
    /// Reserve backing memory for the requested trace segments.
    pub fn reserve_qdss_memory(&self, reserver: &dyn MemoryReserver) -> Result<()> {
        let mut segments = self.peer().qdss_mem.clone();
        for seg in segments.iter_mut().filter(|s| !s.is_reserved() && s.size != 0) {
            let (phys, virt) = reserver.reserve(seg.size, seg.mem_type)?;
            seg.phys = phys;
            seg.virt = virt;
        }
        self.peer().qdss_mem = segments;
        Ok(())
    }

    /// Tell the firmware where its trace memory is.
    ///
    /// In scatter-gather mode every page of the first segment is sent as
    /// its own record, in batches of at most `QMI_WLFW_MAX_NUM_MEM_SEG`;
    /// the final batch carries `end`. Advisory.
    pub fn qdss_mem_info(&self, reserver: &dyn MemoryReserver) -> Result<()> {
        let segments = self.peer().qdss_mem.clone();
        if !self.config.qdss_etr_sg_mode {
            let req = QdssTraceMemInfoReq {
                segments: segments
                    .iter()
                    .map(|s| MemSegGrant {
                        addr: s.phys,
                        size: s.size,
                        mem_type: s.mem_type,
                    })
                    .collect(),
                end: None,
            };
            self.client.call(&req, CallOptions::advisory())?;
            return Ok(());
        }

        let Some(first) = segments.first() else {
            return Err(WlfwError::InvalidState("no QDSS memory to describe".into()));
        };
        let pages = reserver.etr_page_table(first);
        let batches = pages.len().div_ceil(QMI_WLFW_MAX_NUM_MEM_SEG);
        debug!(pages = pages.len(), batches, "Sending ETR page table");
        for (i, batch) in pages.chunks(QMI_WLFW_MAX_NUM_MEM_SEG).enumerate() {
            let req = QdssTraceMemInfoReq {
                segments: batch
                    .iter()
                    .map(|&addr| MemSegGrant {
                        addr,
                        size: PAGE_SIZE as u32,
                        mem_type: first.mem_type,
                    })
                    .collect(),
                end: Some(i + 1 == batches),
            };
            self.client.call(&req, CallOptions::advisory())?;
        }
        Ok(())
    }

    fn require_fw_ready(&self, what: &str) -> Result<DriverState> {
        let flags = self.flags();
        if !flags.contains(DriverState::FW_READY | DriverState::WLFW_CONNECTED) {
            warn!(state = ?flags, "Invalid state for {}", what);
            return Err(WlfwError::InvalidState(format!(
                "{} needs a ready, connected firmware",
                what
            )));
        }
        Ok(flags)
    }

    /// Stream the trace configuration, preferring a per-device file over
    /// the default one. Advisory.
    #[instrument(skip(self))]
    pub fn qdss_config_download(&self) -> Result<()> {
        let flags = self.require_fw_ready("QDSS config download")?;
        if flags.contains(DriverState::QDSS_STARTED) {
            info!("QDSS is already started");
            return Err(WlfwError::InvalidState("QDSS already started".into()));
        }

        let custom = format!(
            "{}_{}{}",
            QDSS_CONFIG_FILE_PREFIX,
            self.config.device_name(),
            QDSS_CONFIG_FILE_SUFFIX
        );
        let default = self
            .config
            .fw_file(&format!("{QDSS_CONFIG_FILE_PREFIX}{QDSS_CONFIG_FILE_SUFFIX}"));
        let data = match self.blobs.fetch(&custom) {
            Ok(data) => data,
            Err(BlobError::NotFound(_)) => {
                info!(file = %default, "No custom QDSS config, loading default");
                self.blobs.fetch(&default)?
            }
            Err(e) => return Err(e.into()),
        };
        debug!(len = data.len(), "Downloading QDSS config");

        stream_download(
            &self.client,
            &data,
            self.config.max_chunk,
            self.client.default_timeout(),
            FaultScope::Advisory,
            |round| QdssTraceConfigDownloadReq {
                total_size: round.remaining,
                seg_id: round.seg_id,
                data: round.data.to_vec(),
                end: round.end,
            },
        )?;
        Ok(())
    }

    /// Switch tracing on or off.
    ///
    /// Turning it off when it was never started is refused locally. The
    /// started flag follows `mode` once a request went out, whatever the
    /// outcome; timeouts, resets and the incompatible-state code are not
    /// faults here.
    pub fn qdss_trace_mode(&self, mode: u32, option: u64) -> Result<()> {
        let flags = self.require_fw_ready("QDSS mode")?;
        if mode == QDSS_TRACE_OFF && !flags.contains(DriverState::QDSS_STARTED) {
            info!("QDSS not started, ignoring stop command");
            self.log(LogLevel::Info, "QDSS not started, stop ignored");
            return Err(WlfwError::InvalidState("QDSS not started".into()));
        }

        let option = if self.config.qdss_etr_sg_mode { 1 } else { option };
        info!(mode, option, "Sending QDSS mode");
        let result = self.client.call(
            &QdssTraceModeReq {
                mode,
                option: Some(option),
            },
            CallOptions::with_scope(FaultScope::DiagnosticToggle),
        );

        match mode {
            QDSS_TRACE_ON => self.peer().flags.insert(DriverState::QDSS_STARTED),
            QDSS_TRACE_OFF => self.peer().flags.remove(DriverState::QDSS_STARTED),
            _ => {}
        }
        result.map(|_| ())
    }

    /// Pull a trace buffer of `total_size` bytes from the firmware and hand
    /// it to the trace sink under `file_name`. Advisory.
    #[instrument(skip(self))]
    pub fn qdss_trace_upload(&self, total_size: u32, file_name: &str) -> Result<()> {
        let msg_id = QMI_WLFW_QDSS_TRACE_DATA_REQ;
        self.client.record(QMI_TYPE_REQ | msg_id, 0, 0);
        let data = match self.receive_trace(total_size) {
            Ok(data) => data,
            Err(e) => {
                self.client.settle(msg_id, Some(&e), FaultScope::Advisory);
                return Err(e);
            }
        };
        self.client.settle(msg_id, None, FaultScope::Advisory);

        self.trace_sink
            .save(file_name, &data)
            .map_err(WlfwError::TraceSave)?;
        info!(file = file_name, len = data.len(), "QDSS trace saved");
        Ok(())
    }

    fn receive_trace(&self, total_size: u32) -> Result<Vec<u8>> {
        let total = total_size as usize;
        let mut buf = Vec::with_capacity(total);
        let mut seg_id = 0u32;
        let mut end = false;

        while buf.len() < total && !end {
            let resp = self
                .client
                .transact(&QdssTraceDataReq { seg_id }, self.client.default_timeout())?;
            let remaining = total - buf.len();
            end = resp.end == Some(true);
            match (resp.total_size, resp.seg_id, resp.data.as_deref()) {
                (Some(t), Some(s), Some(d))
                    if t == total_size
                        && s == seg_id
                        && d.len() <= QMI_WLFW_MAX_DATA_SIZE
                        && d.len() <= remaining
                        && (!d.is_empty() || end) =>
                {
                    buf.extend_from_slice(d);
                }
                (t, s, d) => {
                    return Err(WlfwError::ProtocolMismatch(format!(
                        "expected total {} seg {}, got total {:?} seg {:?} len {:?}",
                        total_size,
                        seg_id,
                        t,
                        s,
                        d.map(<[u8]>::len)
                    )));
                }
            }
            seg_id += 1;
        }

        if buf.len() != total || !end {
            return Err(WlfwError::ProtocolMismatch(format!(
                "trace corrupted: {} bytes missing, end {}",
                total - buf.len(),
                end
            )));
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::*;
    use crate::service::BumpReserver;
    use crate::service::testing::*;
    use crate::state::FwMemSegment;
    use crate::transport::MockTransport;

    fn ready(mock: MockTransport) -> Harness {
        connected(mock, DriverState::FW_READY)
    }

    fn data_resp(total: u32, seg_id: u32, data: &[u8], end: bool) -> QdssTraceDataResp {
        QdssTraceDataResp {
            resp: ResponseStatus::SUCCESS,
            total_size: Some(total),
            seg_id: Some(seg_id),
            data: Some(data.to_vec()),
            end: Some(end),
        }
    }

    #[test]
    fn test_stop_without_start_is_not_sent() {
        let h = ready(MockTransport::with_auto_success());
        let err = h.service.qdss_trace_mode(QDSS_TRACE_OFF, 0).unwrap_err();
        assert!(matches!(err, WlfwError::InvalidState(_)));
        assert!(h.mock.sent().is_empty());
        assert_eq!(h.faults.count(), 0);
    }

    #[test]
    fn test_mode_requires_ready_firmware() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        assert!(h.service.qdss_trace_mode(QDSS_TRACE_ON, 0).is_err());
        assert!(h.mock.sent().is_empty());
    }

    #[test]
    fn test_start_then_stop() {
        let mut config = test_config();
        config.qdss_etr_sg_mode = true;
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.service.client().connect(Default::default()).unwrap();
        h.service
            .peer()
            .flags
            .insert(DriverState::WLFW_CONNECTED | DriverState::FW_READY);

        h.service.qdss_trace_mode(QDSS_TRACE_ON, 0).unwrap();
        assert!(h.service.flags().contains(DriverState::QDSS_STARTED));
        let sent: Vec<QdssTraceModeReq> = h.mock.sent_messages();
        assert_eq!(sent[0].option, Some(1));

        h.service.qdss_trace_mode(QDSS_TRACE_OFF, 0).unwrap();
        assert!(!h.service.flags().contains(DriverState::QDSS_STARTED));
    }

    #[test]
    fn test_timeout_still_marks_started() {
        let mock = MockTransport::new();
        mock.queue_silence();
        let h = ready(mock);

        let err = h.service.qdss_trace_mode(QDSS_TRACE_ON, 0).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(h.faults.count(), 0);
        assert!(h.service.flags().contains(DriverState::QDSS_STARTED));
    }

    #[test]
    fn test_incompatible_state_tolerated() {
        let mock = MockTransport::new();
        mock.queue_failure(QMI_ERR_INCOMPATIBLE_STATE);
        mock.queue_failure(0x01);
        let h = ready(mock);

        assert!(h.service.qdss_trace_mode(QDSS_TRACE_ON, 0).is_err());
        assert_eq!(h.faults.count(), 0);
        assert!(h.service.qdss_trace_mode(QDSS_TRACE_OFF, 0).is_err());
        assert_eq!(h.faults.count(), 1);
        assert!(!h.service.flags().contains(DriverState::QDSS_STARTED));
    }

    #[test]
    fn test_mem_info_direct() {
        let h = ready(MockTransport::with_auto_success());
        h.service.peer().qdss_mem = vec![FwMemSegment {
            mem_type: 6,
            size: 0x10_0000,
            ..Default::default()
        }];
        let reserver = BumpReserver::new(0x9000_0000, 0x20_0000);
        h.service.reserve_qdss_memory(&reserver).unwrap();
        h.service.qdss_mem_info(&reserver).unwrap();

        let sent: Vec<QdssTraceMemInfoReq> = h.mock.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].segments[0].addr, 0x9000_0000);
        assert_eq!(sent[0].end, None);
    }

    #[test]
    fn test_mem_info_etr_batches() {
        let mut config = test_config();
        config.qdss_etr_sg_mode = true;
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.service.client().connect(Default::default()).unwrap();
        h.service.peer().qdss_mem = vec![FwMemSegment {
            mem_type: 6,
            size: 60 * PAGE_SIZE as u32,
            phys: 0x9000_0000,
            virt: 0x9000_0000,
        }];

        let reserver = BumpReserver::new(0, 0);
        h.service.qdss_mem_info(&reserver).unwrap();

        let sent: Vec<QdssTraceMemInfoReq> = h.mock.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].segments.len(), QMI_WLFW_MAX_NUM_MEM_SEG);
        assert_eq!(sent[0].end, Some(false));
        assert_eq!(sent[1].segments.len(), 8);
        assert_eq!(sent[1].end, Some(true));
        assert_eq!(sent[1].segments[0].addr, 0x9000_0000 + 52 * PAGE_SIZE);
    }

    #[test]
    fn test_config_download_prefers_device_file() {
        let mut config = test_config();
        config.device.name = Some("QCN9224_PCI0".into());
        config.fw_path = "qcn9224/".into();
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.service.client().connect(Default::default()).unwrap();
        h.service
            .peer()
            .flags
            .insert(DriverState::WLFW_CONNECTED | DriverState::FW_READY);
        h.blobs.insert("qcn9224/qdss_trace_config.bin", b"default".to_vec());
        h.blobs
            .insert("qdss_trace_config_QCN9224_PCI0.bin", b"custom".to_vec());

        h.service.qdss_config_download().unwrap();
        let sent: Vec<QdssTraceConfigDownloadReq> = h.mock.sent_messages();
        assert_eq!(sent[0].data, b"custom");

        h.blobs.remove("qdss_trace_config_QCN9224_PCI0.bin");
        h.mock.clear_sent();
        h.service.qdss_config_download().unwrap();
        let sent: Vec<QdssTraceConfigDownloadReq> = h.mock.sent_messages();
        assert_eq!(sent[0].data, b"default");
        assert!(sent[0].end);
    }

    #[test]
    fn test_config_download_refused_while_started() {
        let h = ready(MockTransport::with_auto_success());
        h.service.peer().flags.insert(DriverState::QDSS_STARTED);
        assert!(matches!(
            h.service.qdss_config_download(),
            Err(WlfwError::InvalidState(_))
        ));
    }

    #[test]
    fn test_trace_upload_saved() {
        let mock = MockTransport::new();
        mock.queue_response(&data_resp(10, 0, b"abcd", false));
        mock.queue_response(&data_resp(10, 1, b"efgh", false));
        mock.queue_response(&data_resp(10, 2, b"ij", true));
        let h = ready(mock);

        h.service.qdss_trace_upload(10, "qdss_trace").unwrap();
        let saved = h.sink.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "qdss_trace");
        assert_eq!(saved[0].1, b"abcdefghij");

        let sent: Vec<QdssTraceDataReq> = h.mock.sent_messages();
        let ids: Vec<u32> = sent.iter().map(|r| r.seg_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_trace_upload_mismatch_aborts() {
        let mock = MockTransport::new();
        mock.queue_response(&data_resp(10, 0, b"abcd", false));
        mock.queue_response(&data_resp(10, 5, b"efgh", false));
        let h = ready(mock);

        let err = h.service.qdss_trace_upload(10, "qdss_trace").unwrap_err();
        assert!(matches!(err, WlfwError::ProtocolMismatch(_)));
        assert!(h.sink.saved.lock().unwrap().is_empty());
        assert_eq!(h.faults.count(), 0);
        assert_eq!(h.mock.sent().len(), 2);
    }

    #[test]
    fn test_trace_upload_without_end_is_corrupt() {
        let mock = MockTransport::new();
        mock.queue_response(&data_resp(4, 0, b"abcd", false));
        let h = ready(mock);

        assert!(matches!(
            h.service.qdss_trace_upload(4, "t"),
            Err(WlfwError::ProtocolMismatch(_))
        ));
    }
}
