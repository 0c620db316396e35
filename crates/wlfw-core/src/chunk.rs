//! Chunked streaming downloads.
//!
//! Board data, calibration data, INI files and QDSS configuration all go
//! out the same way: a run of requests each carrying at most one chunk,
//! numbered from zero, with `end` set on the last one only.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::catalog::msg_name;
use crate::error::Result;
use crate::fault::FaultScope;
use crate::protocol::constants::QMI_TYPE_REQ;
use crate::protocol::messages::QmiRequest;
use crate::transport::QmiTransport;
use crate::txn::QmiClient;

/// One round of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRound<'a> {
    pub seg_id: u32,
    /// Bytes not yet acknowledged, this chunk included.
    pub remaining: u32,
    pub data: &'a [u8],
    pub end: bool,
}

/// Progress through a transfer.
#[derive(Debug, Clone)]
pub struct ChunkState {
    /// Rounds acknowledged so far.
    pub current: usize,
    /// Total number of rounds.
    pub total: usize,
    /// Current byte offset.
    pub offset: usize,
    /// Size of each chunk.
    pub chunk_size: usize,
    /// Total data size.
    pub data_size: usize,
}

impl ChunkState {
    pub fn new(data_size: usize, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            current: 0,
            total: data_size.div_ceil(chunk_size),
            offset: 0,
            chunk_size,
            data_size,
        }
    }

    /// The round to send next, without advancing.
    pub fn peek<'a>(&self, data: &'a [u8]) -> Option<ChunkRound<'a>> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }
        let len = remaining.min(self.chunk_size);
        Some(ChunkRound {
            seg_id: self.current as u32,
            remaining: remaining as u32,
            data: &data[self.offset..self.offset + len],
            end: len == remaining,
        })
    }

    /// Mark the round returned by `peek` as acknowledged.
    pub fn advance(&mut self) {
        let len = self.remaining().min(self.chunk_size);
        self.offset += len;
        self.current += 1;
    }

    pub fn remaining(&self) -> usize {
        self.data_size - self.offset
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Progress as percentage.
    pub fn progress_pct(&self) -> u8 {
        if self.total == 0 {
            100
        } else {
            ((self.current * 100) / self.total) as u8
        }
    }
}

/// Stream `data` using one `R` request per chunk, built by `build`.
///
/// The audit log gets one REQ record before the first round and one
/// outcome record after the last (or failed) round. Returns the number of
/// rounds sent.
#[instrument(skip(client, data, build), fields(msg = msg_name(R::MSG_ID), len = data.len()))]
pub fn stream_download<T, R, F>(
    client: &QmiClient<T>,
    data: &[u8],
    chunk_size: usize,
    timeout: Duration,
    scope: FaultScope,
    mut build: F,
) -> Result<usize>
where
    T: QmiTransport,
    R: QmiRequest,
    F: FnMut(&ChunkRound<'_>) -> R,
{
    let mut state = ChunkState::new(data.len(), chunk_size);
    client.record(QMI_TYPE_REQ | R::MSG_ID, 0, 0);

    while let Some(round) = state.peek(data) {
        let req = build(&round);
        if let Err(e) = client.transact(&req, timeout) {
            client.settle(R::MSG_ID, Some(&e), scope);
            return Err(e);
        }
        debug!(
            seg_id = round.seg_id,
            len = round.data.len(),
            end = round.end,
            progress = state.progress_pct(),
            "Chunk acknowledged"
        );
        state.advance();
    }

    client.settle(R::MSG_ID, None, scope);
    Ok(state.current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::RecordingReporter;
    use crate::history::{AuditLog, MsgKind};
    use crate::protocol::constants::*;
    use crate::protocol::messages::{BdfDownloadReq, QmiMessage};
    use crate::transport::{MockTransport, ServiceAddress};
    use std::sync::Arc;

    fn bdf(round: &ChunkRound<'_>) -> BdfDownloadReq {
        BdfDownloadReq {
            valid: true,
            file_id: 0xFF,
            total_size: round.remaining,
            seg_id: round.seg_id,
            data: round.data.to_vec(),
            end: round.end,
            bdf_type: BDF_TYPE_GOLDEN,
        }
    }

    fn client(mock: Arc<MockTransport>) -> QmiClient<MockTransport> {
        let c = QmiClient::new(
            mock,
            Arc::new(AuditLog::new(64)),
            Arc::new(RecordingReporter::new()),
            FW_ID_BASE,
            Duration::from_millis(50),
        );
        c.connect(ServiceAddress::default()).unwrap();
        c
    }

    #[test]
    fn test_chunk_state_rounds() {
        for remaining in [1usize, 8191, 8192, 8193, 10 * 8192] {
            let data = vec![0u8; remaining];
            let mut state = ChunkState::new(remaining, 8192);
            let mut rounds = Vec::new();
            while let Some(r) = state.peek(&data) {
                rounds.push((r.seg_id, r.data.len(), r.end));
                state.advance();
            }
            assert_eq!(rounds.len(), remaining.div_ceil(8192));
            for (i, (seg, _, end)) in rounds.iter().enumerate() {
                assert_eq!(*seg as usize, i);
                assert_eq!(*end, i == rounds.len() - 1);
            }
            assert!(state.is_done());
        }
    }

    #[test]
    fn test_empty_transfer_sends_nothing() {
        let state = ChunkState::new(0, 8192);
        assert!(state.peek(&[]).is_none());
        assert_eq!(state.progress_pct(), 100);
    }

    #[test]
    fn test_board_data_300k() {
        let mock = Arc::new(MockTransport::with_auto_success());
        let c = client(mock.clone());
        let data: Vec<u8> = (0..300_000u32).map(|i| i as u8).collect();

        let rounds = stream_download(
            &c,
            &data,
            8192,
            Duration::from_millis(50),
            FaultScope::Fatal,
            bdf,
        )
        .unwrap();
        assert_eq!(rounds, 37);

        let sent = mock.sent_messages::<BdfDownloadReq>();
        assert_eq!(sent.len(), 37);
        assert_eq!(sent[36].data.len(), 300_000 - 36 * 8192);
        assert_eq!(sent[36].total_size, 5088);
        assert!(sent[36].end);
        assert!(sent[..36].iter().all(|r| !r.end));
        assert_eq!(sent[0].total_size, 300_000);

        let reassembled: Vec<u8> = sent.iter().flat_map(|r| r.data.clone()).collect();
        assert_eq!(reassembled, data);

        let kinds: Vec<MsgKind> = c.history().entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MsgKind::Request, MsgKind::Response]);
    }

    #[test]
    fn test_failed_round_aborts() {
        let mock = Arc::new(MockTransport::with_auto_success());
        mock.queue(crate::transport::ScriptedReply::Respond(
            BdfDownloadReq::default().to_bytes(),
        ));
        let c = client(mock.clone());

        // The first response lacks a result TLV and cannot be decoded.
        let err = stream_download(
            &c,
            &[0u8; 100],
            40,
            Duration::from_millis(50),
            FaultScope::Advisory,
            bdf,
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::WlfwError::Codec(_)));
        assert_eq!(mock.sent().len(), 1);
    }
}
