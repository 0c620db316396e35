//! COEX and IMS clients.
//!
//! Both services live beside WLFW on the same message router. COEX arbitrates
//! the shared antenna with the modem; IMS pushes Wi-Fi calling status that
//! the host forwards to the firmware. Neither exchange is audited and
//! failures are logged, never reported as faults.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::constants::*;
use crate::protocol::messages::*;
use crate::service::{IndicationOutcome, WlfwService};
use crate::state::DriverState;
use crate::transport::{QmiTransport, ServiceAddress};
use crate::txn::QmiClient;

fn ancillary_client<T: QmiTransport>(transport: Arc<T>, wlfw: &WlfwService<T>) -> QmiClient<T> {
    QmiClient::new(
        transport,
        wlfw.history().clone(),
        wlfw.client().faults().clone(),
        wlfw.client().instance_id(),
        Duration::from_millis(COEX_TIMEOUT_MS),
    )
}

/// Antenna arbitration client.
pub struct CoexClient<T: QmiTransport> {
    client: QmiClient<T>,
    wlfw: Arc<WlfwService<T>>,
}

impl<T: QmiTransport> CoexClient<T> {
    pub fn new(transport: Arc<T>, wlfw: Arc<WlfwService<T>>) -> Self {
        Self {
            client: ancillary_client(transport, &wlfw),
            wlfw,
        }
    }

    pub fn server_arrive(&self, addr: ServiceAddress) -> Result<()> {
        if let Err(e) = self.client.connect(addr) {
            warn!("Failed to connect to COEX service: {}", e);
            return Err(e.into());
        }
        self.wlfw.peer().flags.insert(DriverState::COEX_CONNECTED);
        info!(node = addr.node, port = addr.port, "COEX server arrived");
        Ok(())
    }

    pub fn server_exit(&self) {
        self.client.disconnect();
        self.wlfw.peer().flags.remove(DriverState::COEX_CONNECTED);
        info!("COEX server exited");
    }

    pub fn is_connected(&self) -> bool {
        self.wlfw.flags().contains(DriverState::COEX_CONNECTED)
    }

    /// Ask the modem to hand the antenna last reported by the firmware to
    /// WLAN. A returned grant is kept for the next antenna grant request.
    pub fn switch_to_wlan(&self) -> Result<Option<u64>> {
        let antenna = self.wlfw.snapshot().antenna;
        debug!(antenna, "Switching antenna to WLAN");
        let resp = self
            .client
            .transact(&CoexSwitchAntennaToWlanReq { antenna }, self.client.default_timeout())
            .inspect_err(|e| warn!("Antenna switch to WLAN failed: {}", e))?;
        if let Some(grant) = resp.grant {
            self.wlfw.peer().grant = grant;
            debug!(grant = format_args!("0x{:x}", grant), "Antenna granted");
        }
        Ok(resp.grant)
    }

    /// Give the antenna back to the modem.
    pub fn switch_to_mdm(&self) -> Result<()> {
        let antenna = self.wlfw.snapshot().antenna;
        debug!(antenna, "Switching antenna to MDM");
        self.client
            .transact(&CoexSwitchAntennaToMdmReq { antenna }, self.client.default_timeout())
            .inspect_err(|e| warn!("Antenna switch to MDM failed: {}", e))?;
        Ok(())
    }
}

/// Wi-Fi calling status client.
pub struct ImsClient<T: QmiTransport> {
    client: QmiClient<T>,
    wlfw: Arc<WlfwService<T>>,
}

impl<T: QmiTransport> ImsClient<T> {
    pub fn new(transport: Arc<T>, wlfw: Arc<WlfwService<T>>) -> Self {
        Self {
            client: ancillary_client(transport, &wlfw),
            wlfw,
        }
    }

    /// Connect and subscribe for call status indications. A failed
    /// subscription leaves the channel connected.
    pub fn server_arrive(&self, addr: ServiceAddress) -> Result<()> {
        if let Err(e) = self.client.connect(addr) {
            warn!("Failed to connect to IMS service: {}", e);
            return Err(e.into());
        }
        self.wlfw.peer().flags.insert(DriverState::IMS_CONNECTED);
        info!(node = addr.node, port = addr.port, "IMS server arrived");

        let req = ImsSubscribeReq {
            wfc_call_status: Some(true),
        };
        self.client
            .transact(&req, self.client.default_timeout())
            .inspect_err(|e| warn!("IMS subscribe for indications failed: {}", e))?;
        Ok(())
    }

    pub fn server_exit(&self) {
        self.client.disconnect();
        self.wlfw.peer().flags.remove(DriverState::IMS_CONNECTED);
        info!("IMS server exited");
    }

    pub fn is_connected(&self) -> bool {
        self.wlfw.flags().contains(DriverState::IMS_CONNECTED)
    }

    /// Relay a call status indication to the firmware verbatim.
    pub fn handle_indication(
        &self,
        msg_id: u16,
        txn: Option<u16>,
        payload: &[u8],
    ) -> IndicationOutcome {
        if msg_id != QMI_IMS_PRIVATE_SERVICE_WFC_CALL_STATUS_IND {
            warn!(msg_id = format_args!("0x{:x}", msg_id), "Unknown IMS indication");
            return IndicationOutcome::Unknown;
        }
        if txn.is_none() {
            warn!("Spurious IMS call status indication");
            return IndicationOutcome::Spurious;
        }
        let ind = match ImsWfcCallStatusInd::from_bytes(payload) {
            Ok(ind) => ind,
            Err(e) => {
                warn!("Malformed IMS call status indication: {}", e);
                return IndicationOutcome::Malformed;
            }
        };
        if payload.len() > QMI_WLFW_MAX_WFC_CALL_STATUS_DATA_SIZE {
            warn!(len = payload.len(), "IMS call status too large to relay");
            return IndicationOutcome::Dropped;
        }
        debug!(active = ind.wfc_call_active, "IMS call status");

        match self.wlfw.wfc_call_status(payload) {
            Ok(()) => IndicationOutcome::Relayed,
            Err(e) => {
                warn!("Failed to relay call status: {}", e);
                IndicationOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    use crate::fault::RecordingReporter;
    use crate::service::testing::test_config;
    use crate::transport::MockTransport;
    use crate::work::WorkItem;

    struct Shared {
        mock: Arc<MockTransport>,
        faults: Arc<RecordingReporter>,
        wlfw: Arc<WlfwService<MockTransport>>,
        _work: Receiver<WorkItem>,
    }

    fn shared() -> Shared {
        let mock = Arc::new(MockTransport::with_auto_success());
        let faults = Arc::new(RecordingReporter::new());
        let (service, work) = WlfwService::builder(mock.clone(), test_config())
            .faults(faults.clone())
            .build();
        service.client().connect(ServiceAddress::default()).unwrap();
        service.peer().flags.insert(DriverState::WLFW_CONNECTED);
        Shared {
            mock,
            faults,
            wlfw: Arc::new(service),
            _work: work,
        }
    }

    #[test]
    fn test_coex_arrival_and_exit() {
        let wlfw = shared().wlfw;
        let coex = CoexClient::new(Arc::new(MockTransport::new()), wlfw.clone());

        coex.server_arrive(ServiceAddress::default()).unwrap();
        assert!(coex.is_connected());
        coex.server_exit();
        assert!(!wlfw.flags().contains(DriverState::COEX_CONNECTED));
    }

    #[test]
    fn test_coex_connect_failure_leaves_flag_clear() {
        let wlfw = shared().wlfw;
        let mock = MockTransport::new();
        mock.fail_connect(true);
        let coex = CoexClient::new(Arc::new(mock), wlfw.clone());

        assert!(coex.server_arrive(ServiceAddress::default()).is_err());
        assert!(!coex.is_connected());
    }

    #[test]
    fn test_coex_switch_to_wlan_stores_grant() {
        let h = shared();
        let wlfw = h.wlfw.clone();
        wlfw.peer().antenna = 2;
        let mock = Arc::new(MockTransport::new());
        mock.queue_response(&CoexSwitchAntennaToWlanResp {
            resp: ResponseStatus::SUCCESS,
            grant: Some(0x5),
        });
        let coex = CoexClient::new(mock.clone(), wlfw.clone());
        coex.server_arrive(ServiceAddress::default()).unwrap();

        assert_eq!(coex.switch_to_wlan().unwrap(), Some(0x5));
        assert_eq!(wlfw.snapshot().grant, 0x5);
        let sent: Vec<CoexSwitchAntennaToWlanReq> = mock.sent_messages();
        assert_eq!(sent[0].antenna, 2);
        // Not audited on the WLFW history.
        assert!(wlfw.history().entries().is_empty());
    }

    #[test]
    fn test_coex_switch_failure_is_not_a_fault() {
        let h = shared();
        let wlfw = h.wlfw.clone();
        let mock = MockTransport::new();
        mock.queue_failure(0x01);
        let coex = CoexClient::new(Arc::new(mock), wlfw.clone());
        coex.server_arrive(ServiceAddress::default()).unwrap();

        assert!(coex.switch_to_mdm().is_err());
        assert_eq!(h.faults.count(), 0);
    }

    #[test]
    fn test_ims_arrival_subscribes() {
        let wlfw = shared().wlfw;
        let mock = Arc::new(MockTransport::with_auto_success());
        let ims = ImsClient::new(mock.clone(), wlfw.clone());

        ims.server_arrive(ServiceAddress::default()).unwrap();
        assert!(ims.is_connected());
        let sent: Vec<ImsSubscribeReq> = mock.sent_messages();
        assert_eq!(sent[0].wfc_call_status, Some(true));

        ims.server_exit();
        assert!(!ims.is_connected());
    }

    #[test]
    fn test_ims_status_relayed_to_firmware() {
        let h = shared();
        let wlfw = h.wlfw.clone();
        let ims = ImsClient::new(Arc::new(MockTransport::with_auto_success()), wlfw);
        let payload = ImsWfcCallStatusInd {
            wfc_call_active: true,
            media_quality: Some(3),
            ..Default::default()
        }
        .to_bytes();

        assert_eq!(
            ims.handle_indication(QMI_IMS_PRIVATE_SERVICE_WFC_CALL_STATUS_IND, Some(1), &payload),
            IndicationOutcome::Relayed
        );
        let sent: Vec<WfcCallStatusReq> = h.mock.sent_messages();
        assert_eq!(sent[0].data, payload);
    }

    #[test]
    fn test_ims_status_without_txn_is_spurious() {
        let h = shared();
        let wlfw = h.wlfw.clone();
        let ims = ImsClient::new(Arc::new(MockTransport::with_auto_success()), wlfw);
        let payload = ImsWfcCallStatusInd::default().to_bytes();

        assert_eq!(
            ims.handle_indication(QMI_IMS_PRIVATE_SERVICE_WFC_CALL_STATUS_IND, None, &payload),
            IndicationOutcome::Spurious
        );
        assert_eq!(
            ims.handle_indication(0x7F, Some(1), &payload),
            IndicationOutcome::Unknown
        );
        assert!(h.mock.sent().is_empty());
    }
}
