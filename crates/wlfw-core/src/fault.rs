//! Fault reporting for unrecoverable protocol failures.
//!
//! Operations return typed errors; whether a given failure is fatal is
//! decided per call by its `FaultScope`, and fatal failures are handed to a
//! `FaultReporter` the host configures.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::catalog::msg_name;
use crate::error::WlfwError;
use crate::lock;
use crate::protocol::constants::QMI_ERR_INCOMPATIBLE_STATE;

/// A failure the protocol cannot continue from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub instance_id: u32,
    pub msg_id: u16,
    pub errno: i32,
    pub peer_error: i32,
    pub message: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(0x{:02X}) failed on instance 0x{:x}: err {} peer err {}: {}",
            msg_name(self.msg_id),
            self.msg_id,
            self.instance_id,
            self.errno,
            self.peer_error,
            self.message
        )
    }
}

pub trait FaultReporter: Send + Sync {
    fn report(&self, fault: &Fault);
}

/// What to do when a fault is raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Log and let the caller carry on with the error.
    #[default]
    Log,
    /// Panic the calling thread so a supervisor can restart the subsystem.
    Panic,
    /// Terminate the process.
    Abort,
}

/// Reporter applying a `FaultPolicy`.
pub struct PolicyReporter {
    policy: FaultPolicy,
}

impl PolicyReporter {
    pub fn new(policy: FaultPolicy) -> Self {
        Self { policy }
    }
}

impl FaultReporter for PolicyReporter {
    fn report(&self, fault: &Fault) {
        error!(
            msg = msg_name(fault.msg_id),
            instance = fault.instance_id,
            err = fault.errno,
            peer_err = fault.peer_error,
            "Fatal WLFW failure: {}",
            fault.message
        );
        match self.policy {
            FaultPolicy::Log => {}
            FaultPolicy::Panic => panic!("WLFW fault: {}", fault),
            FaultPolicy::Abort => std::process::abort(),
        }
    }
}

/// Reporter that keeps every fault for later inspection.
#[derive(Default)]
pub struct RecordingReporter {
    faults: Mutex<Vec<Fault>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<Fault> {
        lock(&self.faults).clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.faults).len()
    }
}

impl FaultReporter for RecordingReporter {
    fn report(&self, fault: &Fault) {
        lock(&self.faults).push(fault.clone());
    }
}

/// How failures of one call are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultScope {
    /// Every failure is fatal.
    Fatal,
    /// Trace mode toggling: timeouts, resets and the incompatible-state
    /// detail code are benign races with teardown.
    DiagnosticToggle,
    /// Teardown requests: every failure is tolerated.
    Teardown,
    /// Errors go back to the caller and are never fatal.
    Advisory,
}

impl FaultScope {
    pub fn tolerates(&self, err: &WlfwError) -> bool {
        match self {
            FaultScope::Fatal => matches!(err, WlfwError::AlreadyRegistered),
            FaultScope::DiagnosticToggle => {
                err.is_timeout()
                    || err.is_connection_reset()
                    || matches!(
                        err,
                        WlfwError::Rejected { error, .. } if *error == QMI_ERR_INCOMPATIBLE_STATE
                    )
            }
            FaultScope::Teardown | FaultScope::Advisory => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    fn rejected(error: u16) -> WlfwError {
        WlfwError::Rejected {
            msg_id: 0x45,
            result: 1,
            error,
        }
    }

    #[test]
    fn test_fatal_scope_allows_only_already_registered() {
        assert!(FaultScope::Fatal.tolerates(&WlfwError::AlreadyRegistered));
        assert!(!FaultScope::Fatal.tolerates(&rejected(1)));
        assert!(!FaultScope::Fatal.tolerates(&WlfwError::Timeout {
            msg_id: 0x34,
            timeout_ms: 10
        }));
    }

    #[test]
    fn test_toggle_scope_allow_list() {
        let scope = FaultScope::DiagnosticToggle;
        assert!(scope.tolerates(&rejected(QMI_ERR_INCOMPATIBLE_STATE)));
        assert!(scope.tolerates(&TransportError::ConnectionReset.into()));
        assert!(scope.tolerates(&WlfwError::Timeout {
            msg_id: 0x45,
            timeout_ms: 10
        }));
        assert!(!scope.tolerates(&rejected(0x01)));
        assert!(!scope.tolerates(&TransportError::SendFailed("x".into()).into()));
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.report(&Fault {
            instance_id: 7,
            msg_id: 0x34,
            errno: -110,
            peer_error: -1,
            message: "timeout".into(),
        });
        assert_eq!(reporter.count(), 1);
        assert_eq!(reporter.faults()[0].msg_id, 0x34);
    }

    #[test]
    #[should_panic(expected = "WLFW fault")]
    fn test_panic_policy() {
        PolicyReporter::new(FaultPolicy::Panic).report(&Fault {
            instance_id: 7,
            msg_id: 0x34,
            errno: -5,
            peer_error: 0,
            message: "send failed".into(),
        });
    }

    #[test]
    fn test_policy_serde_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrap {
            policy: FaultPolicy,
        }
        let w: Wrap = toml::from_str("policy = \"abort\"").unwrap();
        assert_eq!(w.policy, FaultPolicy::Abort);
    }
}
