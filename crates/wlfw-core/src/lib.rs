//! WLFW-Core: host side of the wireless firmware control-plane protocol.
//!
//! This crate drives a remote WLAN firmware image through discovery,
//! capability negotiation, memory hand-off, board-data download, mode
//! switching and runtime diagnostics over a QMI-style message channel.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: Message ids, limits, TLV codec and typed messages
//! - **Transport**: Message channel abstraction (mock for tests)
//! - **Transactions**: Blocking request/response engine with fault policy
//! - **Catalog / History**: Display names and the audit ring of exchanges
//! - **Service**: Lifecycle, bring-up, indication dispatch, resource
//!   negotiation and QDSS diagnostics
//! - **Ancillary**: COEX antenna arbitration and IMS call-status relay
//! - **Events**: Observer pattern for UI decoupling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wlfw_core::config::WlfwConfig;
//! use wlfw_core::service::WlfwService;
//! use wlfw_core::transport::{MockTransport, ServiceAddress};
//!
//! let config = WlfwConfig::default();
//! let (service, work) = WlfwService::builder(Arc::new(MockTransport::with_auto_success()), config)
//!     .build();
//! service.server_arrive(ServiceAddress { node: 1, port: 0x4000 }).expect("bring-up failed");
//! while let Ok(item) = work.try_recv() {
//!     println!("{item}");
//! }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod ancillary;
pub mod blob;
pub mod catalog;
pub mod chunk;
pub mod config;
pub mod error;
pub mod events;
pub mod fault;
pub mod history;
pub mod protocol;
pub mod service;
pub mod state;
pub mod transport;
pub mod txn;
pub mod work;

// Re-exports for convenience
pub use ancillary::{CoexClient, ImsClient};
pub use blob::{BlobError, BlobStore, DirBlobStore, MemoryBlobStore};
pub use config::WlfwConfig;
pub use error::{Result, WlfwError};
pub use events::{LogLevel, NullObserver, TracingObserver, WlfwEvent, WlfwObserver};
pub use fault::{FaultPolicy, FaultReporter, PolicyReporter, RecordingReporter};
pub use history::{AuditLog, HistoryEntry, MsgKind};
pub use service::{MemoryReserver, TraceSink, WlfwService};
pub use state::{BoardIdentity, DriverState, LifecycleState};
pub use transport::{MockTransport, QmiTransport, ServiceAddress, TransportError};
pub use work::WorkItem;

/// Lock a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
