//! Audit log of recent protocol exchanges.
//!
//! A fixed ring of entries guarded by one mutex. Recording never blocks on
//! anything but that lock and never fails; old entries are overwritten.

use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use tracing::error;

use crate::catalog::{device_name, msg_name};
use crate::lock;
use crate::protocol::constants::{QMI_TYPE_MASK, QMI_TYPE_REQ, QMI_TYPE_RESP};

pub const DEFAULT_HISTORY_SIZE: usize = 128;

/// Kind derived from the direction bits and error codes of a record call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MsgKind {
    Request,
    Response,
    Indication,
    #[default]
    Invalid,
}

impl MsgKind {
    /// Errors win over direction bits: a peer error marks a response, a
    /// local error a request.
    pub fn classify(msg_id: u16, error: i32, resp_error: i32) -> Self {
        let dir = msg_id & QMI_TYPE_MASK;
        if resp_error != 0 || dir == QMI_TYPE_RESP {
            MsgKind::Response
        } else if error != 0 || dir == QMI_TYPE_REQ {
            MsgKind::Request
        } else if dir == 0 {
            MsgKind::Indication
        } else {
            MsgKind::Invalid
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MsgKind::Request => "REQ",
            MsgKind::Response => "RESP",
            MsgKind::Indication => "IND",
            MsgKind::Invalid => "INVL",
        }
    }
}

impl fmt::Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    pub instance_id: u32,
    /// Message id with direction bits stripped. Zero marks an unused slot.
    pub msg_id: u16,
    pub kind: MsgKind,
    pub error: i32,
    pub resp_error: i32,
    pub timestamp_ms: u64,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tstamp[{}] ins_id [0x{:x} : {}] msg_id [0x{:x} : {}{}] err[{}] resp_err[{}]",
            self.timestamp_ms,
            self.instance_id,
            device_name(self.instance_id),
            self.msg_id,
            msg_name(self.msg_id),
            self.kind,
            self.error,
            self.resp_error
        )
    }
}

struct Ring {
    slots: Vec<HistoryEntry>,
    index: usize,
}

/// Fixed-capacity ring of protocol exchanges.
pub struct AuditLog {
    ring: Mutex<Ring>,
    epoch: Instant,
}

impl AuditLog {
    /// Capacity is rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            ring: Mutex::new(Ring {
                slots: vec![HistoryEntry::default(); capacity],
                index: 0,
            }),
            epoch: Instant::now(),
        }
    }

    pub fn capacity(&self) -> usize {
        lock(&self.ring).slots.len()
    }

    /// Record one exchange. `msg_id` may carry direction bits.
    pub fn record(&self, instance_id: u32, msg_id: u16, error: i32, resp_error: i32) {
        let kind = MsgKind::classify(msg_id, error, resp_error);
        let stored_error = if error < 0 || resp_error != 0 { error } else { 0 };
        let timestamp_ms = self.epoch.elapsed().as_millis() as u64;

        let mut ring = lock(&self.ring);
        let at = ring.index;
        ring.slots[at] = HistoryEntry {
            instance_id,
            msg_id: msg_id & 0xFF,
            kind,
            error: stored_error,
            resp_error,
            timestamp_ms,
        };
        ring.index = (at + 1) & (ring.slots.len() - 1);
    }

    /// Slot the next record will overwrite.
    pub fn index(&self) -> usize {
        lock(&self.ring).index
    }

    /// Populated entries, oldest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let ring = lock(&self.ring);
        let (newer, older) = ring.slots.split_at(ring.index);
        older
            .iter()
            .chain(newer.iter())
            .filter(|e| e.msg_id != 0)
            .copied()
            .collect()
    }

    /// One line per populated slot, in slot order.
    pub fn dump_lines(&self) -> Vec<String> {
        let ring = lock(&self.ring);
        let last = ring.index.wrapping_sub(1) & (ring.slots.len() - 1);
        let mut lines = vec![format!("qmi_history_index [{}]", last)];
        lines.extend(
            ring.slots
                .iter()
                .enumerate()
                .filter(|(_, e)| e.msg_id != 0)
                .map(|(i, e)| format!("qmi_history[{}]:{}", i, e)),
        );
        lines
    }

    /// Write the whole log through the diagnostic sink.
    pub fn dump_to_log(&self) {
        for line in self.dump_lines() {
            error!("{}", line);
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
