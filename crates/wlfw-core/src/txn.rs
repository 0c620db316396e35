//! Transaction engine: one blocking request/response exchange at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::catalog::msg_name;
use crate::error::{Result, WlfwError};
use crate::fault::{Fault, FaultReporter, FaultScope};
use crate::history::AuditLog;
use crate::lock;
use crate::protocol::constants::{QMI_TYPE_REQ, QMI_TYPE_RESP};
use crate::protocol::messages::{QmiMessage, QmiRequest, QmiResponse};
use crate::transport::{QmiTransport, ResponseSink, ServiceAddress, TransportError};

/// Transactions waiting for their response, keyed by transaction id.
#[derive(Default)]
pub struct PendingTable {
    slots: Mutex<HashMap<u16, (u16, Sender<Vec<u8>>)>>,
}

impl PendingTable {
    fn register(&self, txn_id: u16, msg_id: u16) -> Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel();
        lock(&self.slots).insert(txn_id, (msg_id, tx));
        rx
    }

    fn cancel(&self, txn_id: u16) {
        lock(&self.slots).remove(&txn_id);
    }

    /// Fail every waiter; used when the channel goes away.
    fn clear(&self) {
        lock(&self.slots).clear();
    }

    pub fn outstanding(&self) -> usize {
        lock(&self.slots).len()
    }
}

impl ResponseSink for PendingTable {
    fn deliver(&self, txn_id: u16, msg_id: u16, payload: &[u8]) -> bool {
        let mut slots = lock(&self.slots);
        match slots.get(&txn_id) {
            Some((expected, _)) if *expected == msg_id => {}
            Some((expected, _)) => {
                warn!(
                    txn = txn_id,
                    expected = msg_name(*expected),
                    got = msg_name(msg_id),
                    "Response id mismatch, dropping"
                );
                return false;
            }
            None => {
                debug!(txn = txn_id, msg = msg_name(msg_id), "Late response dropped");
                return false;
            }
        }
        let Some((_, tx)) = slots.remove(&txn_id) else {
            return false;
        };
        tx.send(payload.to_vec()).is_ok()
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub scope: FaultScope,
}

impl CallOptions {
    pub fn fatal() -> Self {
        Self {
            timeout: None,
            scope: FaultScope::Fatal,
        }
    }

    pub fn advisory() -> Self {
        Self {
            timeout: None,
            scope: FaultScope::Advisory,
        }
    }

    pub fn with_scope(scope: FaultScope) -> Self {
        Self {
            timeout: None,
            scope,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// QMI client bound to one service channel.
pub struct QmiClient<T: QmiTransport> {
    transport: Arc<T>,
    pending: Arc<PendingTable>,
    /// Held for the whole of a transaction; calls on one channel never overlap.
    call_lock: Mutex<()>,
    next_txn: AtomicU16,
    history: Arc<AuditLog>,
    faults: Arc<dyn FaultReporter>,
    instance_id: u32,
    default_timeout: Duration,
}

impl<T: QmiTransport> QmiClient<T> {
    pub fn new(
        transport: Arc<T>,
        history: Arc<AuditLog>,
        faults: Arc<dyn FaultReporter>,
        instance_id: u32,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            pending: Arc::new(PendingTable::default()),
            call_lock: Mutex::new(()),
            next_txn: AtomicU16::new(1),
            history,
            faults,
            instance_id,
            default_timeout,
        }
    }

    pub fn connect(&self, addr: ServiceAddress) -> std::result::Result<(), TransportError> {
        self.transport.connect(addr, self.pending.clone())
    }

    pub fn disconnect(&self) {
        self.transport.disconnect();
        self.pending.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn history(&self) -> &Arc<AuditLog> {
        &self.history
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn faults(&self) -> &Arc<dyn FaultReporter> {
        &self.faults
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    fn alloc_txn(&self) -> u16 {
        loop {
            let id = self.next_txn.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }

    /// One exchange without audit records or fault handling.
    pub fn transact<R: QmiRequest>(&self, req: &R, timeout: Duration) -> Result<R::Response> {
        let _serial = lock(&self.call_lock);
        let txn_id = self.alloc_txn();
        let msg_id = R::MSG_ID;

        // Registered before sending so a fast response always finds its slot.
        let rx = self.pending.register(txn_id, msg_id);
        if let Err(e) = self.transport.send_request(txn_id, msg_id, &req.to_bytes()) {
            self.pending.cancel(txn_id);
            return Err(e.into());
        }

        let payload = match rx.recv_timeout(timeout) {
            Ok(p) => p,
            Err(RecvTimeoutError::Timeout) => {
                self.pending.cancel(txn_id);
                return Err(WlfwError::Timeout {
                    msg_id,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TransportError::ConnectionReset.into());
            }
        };

        let resp = R::Response::from_bytes(&payload)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WlfwError::Rejected {
                msg_id,
                result: status.result,
                error: status.error,
            });
        }
        Ok(resp)
    }

    /// One audited exchange: REQ record, transaction, outcome record, and a
    /// fault report when `opts.scope` does not tolerate the failure.
    pub fn call<R: QmiRequest>(&self, req: &R, opts: CallOptions) -> Result<R::Response> {
        self.record(QMI_TYPE_REQ | R::MSG_ID, 0, 0);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let result = self.transact(req, timeout);
        self.settle(R::MSG_ID, result.as_ref().err(), opts.scope);
        result
    }

    /// Record the outcome of an exchange and apply the fault policy.
    pub fn settle(&self, msg_id: u16, err: Option<&WlfwError>, scope: FaultScope) {
        match err {
            None => self.record(QMI_TYPE_RESP | msg_id, 0, 0),
            Some(e) => {
                self.record(msg_id, e.errno(), e.peer_error());
                self.fail(msg_id, e, scope);
            }
        }
    }

    /// Log a failure and report it when `scope` does not tolerate it.
    pub fn fail(&self, msg_id: u16, err: &WlfwError, scope: FaultScope) {
        error!(
            msg = msg_name(msg_id),
            err = err.errno(),
            peer_err = err.peer_error(),
            "Request failed: {}",
            err
        );
        if !scope.tolerates(err) {
            self.faults.report(&Fault {
                instance_id: self.instance_id,
                msg_id,
                errno: err.errno(),
                peer_error: err.peer_error(),
                message: err.to_string(),
            });
        }
    }

    pub fn record(&self, msg_id: u16, error: i32, resp_error: i32) {
        self.history.record(self.instance_id, msg_id, error, resp_error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::RecordingReporter;
    use crate::history::MsgKind;
    use crate::protocol::constants::*;
    use crate::protocol::messages::*;
    use crate::transport::{MockTransport, ScriptedReply};
    use std::thread;

    fn client(mock: MockTransport) -> (QmiClient<MockTransport>, Arc<RecordingReporter>) {
        let faults = Arc::new(RecordingReporter::new());
        let c = QmiClient::new(
            Arc::new(mock),
            Arc::new(AuditLog::new(16)),
            faults.clone(),
            FW_ID_BASE,
            Duration::from_millis(50),
        );
        c.connect(ServiceAddress::default()).unwrap();
        (c, faults)
    }

    #[test]
    fn test_call_success_records_req_and_resp() {
        let (c, faults) = client(MockTransport::with_auto_success());
        c.call(&HostCapReq::default(), CallOptions::fatal()).unwrap();

        let kinds: Vec<MsgKind> = c.history().entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MsgKind::Request, MsgKind::Response]);
        assert_eq!(faults.count(), 0);
    }

    #[test]
    fn test_timeout_is_fatal_for_host_cap() {
        let mock = MockTransport::new();
        mock.queue_silence();
        let (c, faults) = client(mock);

        let err = c
            .call(&HostCapReq::default(), CallOptions::fatal())
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.errno(), -110);

        let last = *c.history().entries().last().unwrap();
        assert_eq!(last.msg_id, QMI_WLFW_HOST_CAP_REQ);
        assert_eq!(last.error, -110);
        assert_eq!(last.resp_error, -1);
        assert_eq!(faults.count(), 1);
        assert_eq!(c.pending().outstanding(), 0);
    }

    #[test]
    fn test_rejection_carries_peer_detail() {
        let mock = MockTransport::new();
        mock.queue_failure(0x30);
        let (c, faults) = client(mock);

        let err = c
            .call(&WlanCfgReq::default(), CallOptions::advisory())
            .unwrap_err();
        assert!(matches!(err, WlfwError::Rejected { result: 1, error: 0x30, .. }));
        assert_eq!(faults.count(), 0);
    }

    #[test]
    fn test_send_failure_never_waits() {
        let mock = MockTransport::new();
        mock.queue_send_error();
        let (c, _) = client(mock);

        let err = c
            .transact(&CapReq, Duration::from_secs(30))
            .unwrap_err();
        assert!(matches!(err, WlfwError::Transport(TransportError::SendFailed(_))));
        assert_eq!(c.pending().outstanding(), 0);
    }

    #[test]
    fn test_late_response_discarded() {
        let mock = MockTransport::new();
        let late = CapResp {
            resp: ResponseStatus::SUCCESS,
            board_id: Some(0x12),
            ..Default::default()
        };
        mock.queue(ScriptedReply::Delayed(Duration::from_millis(150), late.to_bytes()));
        mock.queue_response(&CapResp {
            resp: ResponseStatus::SUCCESS,
            board_id: Some(0x34),
            ..Default::default()
        });
        let (c, _) = client(mock);

        assert!(c.transact(&CapReq, Duration::from_millis(20)).unwrap_err().is_timeout());
        let resp = c.transact(&CapReq, Duration::from_millis(20)).unwrap();
        assert_eq!(resp.board_id, Some(0x34));

        // The first reply shows up after both calls; nothing is waiting.
        thread::sleep(Duration::from_millis(200));
        assert_eq!(c.pending().outstanding(), 0);
    }

    #[test]
    fn test_concurrent_calls_are_serialized() {
        let mock = MockTransport::new();
        for board in [1u32, 2] {
            mock.queue(ScriptedReply::Delayed(
                Duration::from_millis(30),
                CapResp {
                    resp: ResponseStatus::SUCCESS,
                    board_id: Some(board),
                    ..Default::default()
                }
                .to_bytes(),
            ));
        }
        let (c, _) = client(mock);
        let c = Arc::new(c);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || c.transact(&CapReq, Duration::from_secs(2)).unwrap())
            })
            .collect();
        let mut boards: Vec<u32> = handles
            .into_iter()
            .map(|h| h.join().unwrap().board_id.unwrap())
            .collect();
        boards.sort();
        assert_eq!(boards, vec![1, 2]);
    }

    #[test]
    fn test_disconnect_fails_waiters() {
        let mock = MockTransport::new();
        mock.queue_silence();
        let (c, _) = client(mock);
        let c = Arc::new(c);

        let waiter = {
            let c = c.clone();
            thread::spawn(move || c.transact(&CapReq, Duration::from_secs(5)))
        };
        while c.pending().outstanding() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        c.disconnect();
        let err = waiter.join().unwrap().unwrap_err();
        assert!(err.is_connection_reset());
    }
}
