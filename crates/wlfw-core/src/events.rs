//! Service events for hosts that want more than log lines.
//!
//! Lets the CLI (or any host) follow lifecycle transitions, transfer
//! progress and faults without coupling to the protocol code.

use std::fmt;

use crate::state::LifecycleState;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by a WLFW service.
#[derive(Debug, Clone)]
pub enum WlfwEvent {
    /// Lifecycle transition.
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    /// A streaming transfer finished a round.
    Progress {
        operation: String,
        current: u64,
        total: u64,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// A failure the fault policy did not tolerate.
    Fault { msg_id: u16, errno: i32, message: String },
    /// Bring-up finished.
    BringupComplete,
}

impl fmt::Display for WlfwEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WlfwEvent::StateChanged { from, to } => write!(f, "{} -> {}", from, to),
            WlfwEvent::Progress {
                operation,
                current,
                total,
            } => write!(f, "{} {}/{}", operation, current, total),
            WlfwEvent::Log { message, .. } => write!(f, "{}", message),
            WlfwEvent::Fault {
                msg_id,
                errno,
                message,
            } => write!(f, "fault on 0x{:02X} ({}): {}", msg_id, errno, message),
            WlfwEvent::BringupComplete => write!(f, "bring-up complete"),
        }
    }
}

/// Observer trait for receiving WLFW events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait WlfwObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &WlfwEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl WlfwObserver for NullObserver {
    fn on_event(&self, _event: &WlfwEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl WlfwObserver for TracingObserver {
    fn on_event(&self, event: &WlfwEvent) {
        match event {
            WlfwEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Lifecycle changed");
            }
            WlfwEvent::Progress {
                operation,
                current,
                total,
            } => {
                let pct = if *total > 0 {
                    (*current * 100) / *total
                } else {
                    0
                };
                tracing::debug!(operation = %operation, progress = %format!("{}%", pct), "Progress");
            }
            WlfwEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            WlfwEvent::Fault {
                msg_id,
                errno,
                message,
            } => {
                tracing::error!(msg_id = msg_id, err = errno, "Fault: {}", message);
            }
            WlfwEvent::BringupComplete => {
                tracing::info!("Bring-up complete");
            }
        }
    }
}
