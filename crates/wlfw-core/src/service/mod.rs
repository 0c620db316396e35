//! WLFW service: one firmware peer and everything negotiated with it.
//!
//! This module is split into submodules by functionality:
//! - `lifecycle`: server arrival/departure and state flags
//! - `bringup`: indication registration, capabilities, INI download
//! - `indication`: indication dispatch and work-item hand-off
//! - `resource`: memory hand-off, board data, M3 info, calibration report
//! - `bdf`: board-data file naming
//! - `qdss`: trace memory, configuration, mode and data upload
//! - `control`: mode, configuration and diagnostic requests

mod bdf;
mod bringup;
mod control;
mod indication;
mod lifecycle;
mod qdss;
mod resource;

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::blob::{BlobStore, DirBlobStore};
use crate::config::WlfwConfig;
use crate::error::Result;
use crate::events::{LogLevel, TracingObserver, WlfwEvent, WlfwObserver};
use crate::fault::{Fault, FaultReporter, PolicyReporter};
use crate::history::AuditLog;
use crate::lock;
use crate::protocol::constants::PAGE_SIZE;
use crate::state::{BoardIdentity, DriverState, FwMemSegment, LifecycleState, PeerState};
use crate::transport::QmiTransport;
use crate::txn::QmiClient;
use crate::work::{WorkItem, WorkQueue};

pub use bdf::{BdfKind, BdfTarget};
pub use indication::IndicationOutcome;
pub use resource::BumpReserver;

/// Host memory reservation.
pub trait MemoryReserver: Send + Sync {
    /// Reserve `size` bytes, returning `(physical, virtual)` handles.
    fn reserve(&self, size: u32, mem_type: u32) -> Result<(u64, u64)>;

    /// Physical page addresses backing a scatter-gather trace buffer.
    fn etr_page_table(&self, seg: &FwMemSegment) -> Vec<u64> {
        let pages = u64::from(seg.size).div_ceil(PAGE_SIZE);
        (0..pages).map(|i| seg.phys + i * PAGE_SIZE).collect()
    }
}

/// Destination of uploaded QDSS trace buffers.
pub trait TraceSink: Send + Sync {
    fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<()>;
}

/// Writes trace buffers as files under a dump directory.
pub struct DirTraceSink {
    dir: PathBuf,
}

impl DirTraceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TraceSink for DirTraceSink {
    fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        debug!(path = %path.display(), len = data.len(), "Saving QDSS trace");
        std::fs::write(path, data)
    }
}

/// Forwards faults to the configured reporter and to the observer.
struct ObservedReporter {
    inner: Arc<dyn FaultReporter>,
    observer: Arc<dyn WlfwObserver>,
}

impl FaultReporter for ObservedReporter {
    fn report(&self, fault: &Fault) {
        self.observer.on_event(&WlfwEvent::Fault {
            msg_id: fault.msg_id,
            errno: fault.errno,
            message: fault.message.clone(),
        });
        self.inner.report(fault);
    }
}

/// Host side of one WLFW peer.
pub struct WlfwService<T: QmiTransport> {
    client: QmiClient<T>,
    peer: Mutex<PeerState>,
    config: WlfwConfig,
    blobs: Arc<dyn BlobStore>,
    observer: Arc<dyn WlfwObserver>,
    work: WorkQueue,
    trace_sink: Arc<dyn TraceSink>,
}

/// Builder for `WlfwService`; collaborators default from the configuration.
pub struct WlfwServiceBuilder<T: QmiTransport> {
    transport: Arc<T>,
    config: WlfwConfig,
    blobs: Option<Arc<dyn BlobStore>>,
    observer: Arc<dyn WlfwObserver>,
    faults: Option<Arc<dyn FaultReporter>>,
    trace_sink: Option<Arc<dyn TraceSink>>,
    history: Option<Arc<AuditLog>>,
}

impl<T: QmiTransport> WlfwServiceBuilder<T> {
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WlfwObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn faults(mut self, faults: Arc<dyn FaultReporter>) -> Self {
        self.faults = Some(faults);
        self
    }

    pub fn trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Share an audit log with other services.
    pub fn history(mut self, history: Arc<AuditLog>) -> Self {
        self.history = Some(history);
        self
    }

    /// Returns the service and the receiving end of its work queue.
    pub fn build(self) -> (WlfwService<T>, Receiver<WorkItem>) {
        let config = self.config;
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(AuditLog::new(config.history_size)));
        let faults: Arc<dyn FaultReporter> = Arc::new(ObservedReporter {
            inner: self
                .faults
                .unwrap_or_else(|| Arc::new(PolicyReporter::new(config.fault_policy))),
            observer: self.observer.clone(),
        });
        let client = QmiClient::new(
            self.transport,
            history,
            faults,
            config.audit_instance(),
            config.timeout(),
        );
        let blobs = self
            .blobs
            .unwrap_or_else(|| Arc::new(DirBlobStore::new(&config.firmware_dir)));
        let trace_sink = self
            .trace_sink
            .unwrap_or_else(|| Arc::new(DirTraceSink::new(&config.qdss_dump_dir)));
        let peer = PeerState {
            tgt_mem_cfg_mode: config.mem_cfg_mode(),
            ..Default::default()
        };
        let (work, rx) = WorkQueue::new();

        let service = WlfwService {
            client,
            peer: Mutex::new(peer),
            config,
            blobs,
            observer: self.observer,
            work,
            trace_sink,
        };
        (service, rx)
    }
}

impl<T: QmiTransport> WlfwService<T> {
    pub fn builder(transport: Arc<T>, config: WlfwConfig) -> WlfwServiceBuilder<T> {
        WlfwServiceBuilder {
            transport,
            config,
            blobs: None,
            observer: Arc::new(TracingObserver),
            faults: None,
            trace_sink: None,
            history: None,
        }
    }

    pub fn config(&self) -> &WlfwConfig {
        &self.config
    }

    pub fn client(&self) -> &QmiClient<T> {
        &self.client
    }

    pub fn history(&self) -> &Arc<AuditLog> {
        self.client.history()
    }

    pub fn transport(&self) -> &Arc<T> {
        self.client.transport()
    }

    /// Snapshot of the peer state.
    pub fn snapshot(&self) -> PeerState {
        self.peer().clone()
    }

    pub fn flags(&self) -> DriverState {
        self.peer().flags
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.peer().lifecycle
    }

    pub fn identity(&self) -> BoardIdentity {
        self.peer().identity.clone()
    }

    /// The short-lived lock over peer state. Never held across an exchange.
    pub(crate) fn peer(&self) -> MutexGuard<'_, PeerState> {
        lock(&self.peer)
    }

    pub(crate) fn emit(&self, event: WlfwEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(WlfwEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub(crate) fn set_lifecycle(&self, to: LifecycleState) {
        let from = {
            let mut peer = self.peer();
            std::mem::replace(&mut peer.lifecycle, to)
        };
        if from != to {
            self.emit(WlfwEvent::StateChanged { from, to });
        }
    }

    pub(crate) fn post(&self, item: WorkItem) {
        self.work.post(item);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::fault::RecordingReporter;
    use crate::transport::{MockTransport, ServiceAddress};

    /// Trace sink keeping every saved buffer.
    #[derive(Default)]
    pub struct MemoryTraceSink {
        pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl TraceSink for MemoryTraceSink {
        fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<()> {
            lock(&self.saved).push((file_name.to_string(), data.to_vec()));
            Ok(())
        }
    }

    pub struct Harness {
        pub service: WlfwService<MockTransport>,
        pub work: Receiver<WorkItem>,
        pub mock: Arc<MockTransport>,
        pub blobs: Arc<MemoryBlobStore>,
        pub faults: Arc<RecordingReporter>,
        pub sink: Arc<MemoryTraceSink>,
    }

    impl Harness {
        pub fn drain(&self) -> Vec<WorkItem> {
            self.work.try_iter().collect()
        }
    }

    pub fn test_config() -> WlfwConfig {
        let mut config = WlfwConfig::default();
        config.timeout_ms = 50;
        config.ftm_marker_path = None;
        config
    }

    pub fn harness_with(mock: MockTransport, config: WlfwConfig) -> Harness {
        let mock = Arc::new(mock);
        let blobs = Arc::new(MemoryBlobStore::new());
        let faults = Arc::new(RecordingReporter::new());
        let sink = Arc::new(MemoryTraceSink::default());
        let (service, work) = WlfwService::builder(mock.clone(), config)
            .blobs(blobs.clone())
            .faults(faults.clone())
            .trace_sink(sink.clone())
            .build();
        Harness {
            service,
            work,
            mock,
            blobs,
            faults,
            sink,
        }
    }

    pub fn harness(mock: MockTransport) -> Harness {
        harness_with(mock, test_config())
    }

    /// Harness with the channel bound and the flags a ready firmware has.
    pub fn connected(mock: MockTransport, flags: DriverState) -> Harness {
        let h = harness(mock);
        h.service
            .client()
            .connect(ServiceAddress::default())
            .unwrap();
        h.service.peer().flags.insert(DriverState::WLFW_CONNECTED | flags);
        h
    }
}
