//! Work items handed from indication handlers to the host's event queue.
//!
//! Handlers never run heavyweight exchanges themselves; they post a
//! `WorkItem` and return. The receiving end belongs to the host.

use std::fmt;
use std::sync::mpsc::{Receiver, Sender, channel};

use tracing::{debug, warn};

use crate::protocol::messages::QdssTraceSeg;

/// Calibration status carried by cold-boot calibration completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalStatus {
    Done,
    Timeout,
    Failure,
}

/// Payload of a QDSS trace save or data request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdssTraceEvent {
    pub total_size: u32,
    pub file_name: String,
    /// Segments to save; empty for data requests.
    pub mem_seg: Vec<QdssTraceSeg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Firmware asked for memory; segments are in the peer state.
    MemoryRequested,
    FwMemReady,
    /// Firmware initialisation done.
    FwReady,
    ColdBootCalDone { status: CalStatus },
    QdssTraceReqMem,
    QdssTraceSave(QdssTraceEvent),
    QdssTraceReqData(QdssTraceEvent),
    QdssTraceFree,
    QdssMemReady,
    M3DumpUploadReq { pdev_id: u32, addr: u64, size: u64 },
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::MemoryRequested => write!(f, "REQUEST_MEM"),
            WorkItem::FwMemReady => write!(f, "FW_MEM_READY"),
            WorkItem::FwReady => write!(f, "FW_READY"),
            WorkItem::ColdBootCalDone { status } => {
                write!(f, "COLD_BOOT_CAL_DONE({:?})", status)
            }
            WorkItem::QdssTraceReqMem => write!(f, "QDSS_TRACE_REQ_MEM"),
            WorkItem::QdssTraceSave(ev) => write!(
                f,
                "QDSS_TRACE_SAVE({}, {} bytes, {} segs)",
                ev.file_name,
                ev.total_size,
                ev.mem_seg.len()
            ),
            WorkItem::QdssTraceReqData(ev) => {
                write!(f, "QDSS_TRACE_REQ_DATA({}, {} bytes)", ev.file_name, ev.total_size)
            }
            WorkItem::QdssTraceFree => write!(f, "QDSS_TRACE_FREE"),
            WorkItem::QdssMemReady => write!(f, "QDSS_MEM_READY"),
            WorkItem::M3DumpUploadReq {
                pdev_id,
                addr,
                size,
            } => write!(
                f,
                "M3_DUMP_UPLOAD_REQ(pdev {}, 0x{:x}, 0x{:x})",
                pdev_id, addr, size
            ),
        }
    }
}

/// Producer side of the host event queue.
#[derive(Clone)]
pub struct WorkQueue {
    tx: Sender<WorkItem>,
}

impl WorkQueue {
    pub fn new() -> (Self, Receiver<WorkItem>) {
        let (tx, rx) = channel();
        (Self { tx }, rx)
    }

    /// Hand an item off. A host that dropped its receiver only loses the item.
    pub fn post(&self, item: WorkItem) {
        debug!(item = %item, "Posting work item");
        if self.tx.send(item).is_err() {
            warn!("Work queue receiver gone, item dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_in_order() {
        let (queue, rx) = WorkQueue::new();
        queue.post(WorkItem::MemoryRequested);
        queue.post(WorkItem::FwMemReady);

        assert_eq!(rx.try_recv().unwrap(), WorkItem::MemoryRequested);
        assert_eq!(rx.try_recv().unwrap(), WorkItem::FwMemReady);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_post_without_receiver() {
        let (queue, rx) = WorkQueue::new();
        drop(rx);
        queue.post(WorkItem::QdssTraceFree);
    }

    #[test]
    fn test_display() {
        let item = WorkItem::M3DumpUploadReq {
            pdev_id: 1,
            addr: 0x4000_0000,
            size: 0x1000,
        };
        assert_eq!(
            item.to_string(),
            "M3_DUMP_UPLOAD_REQ(pdev 1, 0x40000000, 0x1000)"
        );
    }
}
