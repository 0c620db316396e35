//! Mock QMI transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::traits::{QmiTransport, ResponseSink, ServiceAddress, TransportError};
use crate::lock;
use crate::protocol::messages::{QmiMessage, ResponseStatus};
use crate::protocol::tlv::TlvWriter;

/// What the mock does with the next outgoing request.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Deliver this payload before `send_request` returns.
    Respond(Vec<u8>),
    /// Deliver this payload from another thread after a delay.
    Delayed(Duration, Vec<u8>),
    /// Never answer, forcing a timeout.
    Silent,
    /// Fail the send itself.
    SendError,
}

/// One captured request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub txn_id: u16,
    pub msg_id: u16,
    pub payload: Vec<u8>,
}

/// Mock transport for unit testing protocol logic.
pub struct MockTransport {
    /// Replies consumed in order, one per request.
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    /// Captured requests.
    sent_log: Arc<Mutex<Vec<SentRequest>>>,
    sink: Arc<Mutex<Option<Arc<dyn ResponseSink>>>>,
    connected: Arc<Mutex<bool>>,
    connect_fails: Arc<Mutex<bool>>,
    /// Answer unscripted requests with a bare success status.
    auto_success: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            sent_log: Arc::new(Mutex::new(Vec::new())),
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(Mutex::new(false)),
            connect_fails: Arc::new(Mutex::new(false)),
            auto_success: false,
        }
    }

    /// Mock that answers every unscripted request with success.
    pub fn with_auto_success() -> Self {
        Self {
            auto_success: true,
            ..Self::new()
        }
    }

    pub fn queue(&self, reply: ScriptedReply) {
        lock(&self.script).push_back(reply);
    }

    /// Queue an encoded response message.
    pub fn queue_response<M: QmiMessage>(&self, msg: &M) {
        self.queue(ScriptedReply::Respond(msg.to_bytes()));
    }

    /// Queue a response carrying only a failure status.
    pub fn queue_failure(&self, error: u16) {
        let mut w = TlvWriter::new();
        ResponseStatus::failure(error).encode(&mut w);
        self.queue(ScriptedReply::Respond(w.into_bytes()));
    }

    pub fn queue_silence(&self) {
        self.queue(ScriptedReply::Silent);
    }

    pub fn queue_send_error(&self) {
        self.queue(ScriptedReply::SendError);
    }

    /// Get all captured requests.
    pub fn sent(&self) -> Vec<SentRequest> {
        lock(&self.sent_log).clone()
    }

    /// Decode every captured request of type `M`.
    pub fn sent_messages<M: QmiMessage>(&self) -> Vec<M> {
        lock(&self.sent_log)
            .iter()
            .filter(|r| r.msg_id == M::MSG_ID)
            .filter_map(|r| M::from_bytes(&r.payload).ok())
            .collect()
    }

    /// Message ids of captured requests, in send order.
    pub fn sent_ids(&self) -> Vec<u16> {
        lock(&self.sent_log).iter().map(|r| r.msg_id).collect()
    }

    pub fn clear_sent(&self) {
        lock(&self.sent_log).clear();
    }

    /// Make the next connects fail.
    pub fn fail_connect(&self, fail: bool) {
        *lock(&self.connect_fails) = fail;
    }

    /// Simulate the peer dropping the channel.
    pub fn drop_link(&self) {
        *lock(&self.connected) = false;
    }

    /// Deliver a payload as if the peer sent it for `txn_id`.
    pub fn inject_response(&self, txn_id: u16, msg_id: u16, payload: &[u8]) -> bool {
        let sink = lock(&self.sink).clone();
        sink.is_some_and(|s| s.deliver(txn_id, msg_id, payload))
    }

    fn bare_success() -> Vec<u8> {
        let mut w = TlvWriter::new();
        ResponseStatus::SUCCESS.encode(&mut w);
        w.into_bytes()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl QmiTransport for MockTransport {
    fn connect(
        &self,
        addr: ServiceAddress,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<(), TransportError> {
        if *lock(&self.connect_fails) {
            return Err(TransportError::ConnectFailed {
                node: addr.node,
                port: addr.port,
                reason: "scripted failure".into(),
            });
        }
        *lock(&self.sink) = Some(sink);
        *lock(&self.connected) = true;
        Ok(())
    }

    fn send_request(
        &self,
        txn_id: u16,
        msg_id: u16,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if !*lock(&self.connected) {
            return Err(TransportError::NotConnected);
        }
        let reply = lock(&self.script).pop_front();
        let reply = match reply {
            Some(r) => r,
            None if self.auto_success => ScriptedReply::Respond(Self::bare_success()),
            None => ScriptedReply::Silent,
        };
        if matches!(reply, ScriptedReply::SendError) {
            return Err(TransportError::SendFailed("scripted failure".into()));
        }
        lock(&self.sent_log).push(SentRequest {
            txn_id,
            msg_id,
            payload: payload.to_vec(),
        });

        let sink = lock(&self.sink).clone();
        match (reply, sink) {
            (ScriptedReply::Respond(bytes), Some(sink)) => {
                sink.deliver(txn_id, msg_id, &bytes);
            }
            (ScriptedReply::Delayed(delay, bytes), Some(sink)) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    sink.deliver(txn_id, msg_id, &bytes);
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn disconnect(&self) {
        *lock(&self.connected) = false;
        *lock(&self.sink) = None;
    }

    fn is_connected(&self) -> bool {
        *lock(&self.connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink(Mutex<Vec<(u16, u16)>>);

    impl ResponseSink for CountingSink {
        fn deliver(&self, txn_id: u16, msg_id: u16, _payload: &[u8]) -> bool {
            lock(&self.0).push((txn_id, msg_id));
            true
        }
    }

    #[test]
    fn test_mock_script_order() {
        let mock = MockTransport::new();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        mock.connect(ServiceAddress::default(), sink.clone()).unwrap();

        mock.queue(ScriptedReply::Respond(vec![]));
        mock.queue_silence();
        mock.send_request(1, 0x20, b"a").unwrap();
        mock.send_request(2, 0x34, b"b").unwrap();

        assert_eq!(*lock(&sink.0), vec![(1, 0x20)]);
        assert_eq!(mock.sent_ids(), vec![0x20, 0x34]);
    }

    #[test]
    fn test_mock_send_error_not_logged() {
        let mock = MockTransport::new();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        mock.connect(ServiceAddress::default(), sink).unwrap();

        mock.queue_send_error();
        assert!(mock.send_request(1, 0x20, b"").is_err());
        assert!(mock.sent().is_empty());
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        assert!(!mock.is_connected());
        assert!(matches!(
            mock.send_request(1, 0x20, b""),
            Err(TransportError::NotConnected)
        ));

        mock.fail_connect(true);
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        assert!(mock.connect(ServiceAddress::default(), sink).is_err());
        assert!(!mock.is_connected());
    }
}
