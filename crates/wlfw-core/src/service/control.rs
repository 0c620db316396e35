//! Mode, configuration and diagnostic requests issued by the host after
//! bring-up.

use tracing::{debug, info};

use super::WlfwService;
use crate::error::{Result, WlfwError};
use crate::fault::FaultScope;
use crate::protocol::constants::*;
use crate::protocol::messages::*;
use crate::state::DriverState;
use crate::transport::QmiTransport;
use crate::txn::CallOptions;

fn check_diag_len(len: usize) -> Result<()> {
    if len == 0 || len > QMI_WLFW_MAX_DATA_SIZE {
        return Err(WlfwError::InvalidArgument(format!(
            "diagnostic length {} outside 1..={}",
            len, QMI_WLFW_MAX_DATA_SIZE
        )));
    }
    Ok(())
}

impl<T: QmiTransport> WlfwService<T> {
    /// Switch the firmware operating mode.
    ///
    /// OFF is a no-op during recovery, and its failures are tolerated since
    /// the service may already be going away. Other modes are fatal on
    /// failure.
    pub fn wlan_mode(&self, mode: WlanMode) -> Result<()> {
        info!(mode = %mode, state = ?self.flags(), "Sending mode message");
        let off = mode == WlanMode::Off;
        if off && self.flags().contains(DriverState::DRIVER_RECOVERY) {
            debug!("Recovery is in progress, ignore mode off request");
            return Ok(());
        }

        let req = WlanModeReq {
            mode,
            hw_debug: Some(false),
        };
        let scope = if off {
            FaultScope::Teardown
        } else {
            FaultScope::Fatal
        };
        match self.client.call(&req, CallOptions::with_scope(scope)) {
            Ok(_) => Ok(()),
            Err(e) if off => {
                debug!("WLFW service gone while sending mode off: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Send pipe and shadow register configuration, clamped to what one
    /// request carries. Fatal on failure.
    pub fn wlan_cfg(&self, mut cfg: WlanCfgReq) -> Result<()> {
        cfg.clamp();
        debug!(
            ce = cfg.tgt_cfg.len(),
            svc = cfg.svc_cfg.len(),
            shadow = cfg.shadow_reg_v2.len(),
            "Sending WLAN config"
        );
        self.client.call(&cfg, CallOptions::fatal())?;
        Ok(())
    }

    /// Read `len` bytes of target memory.
    pub fn athdiag_read(&self, offset: u32, mem_type: u32, len: u32) -> Result<Vec<u8>> {
        check_diag_len(len as usize)?;
        let resp = self.client.call(
            &AthdiagReadReq {
                offset,
                mem_type,
                data_len: len,
            },
            CallOptions::advisory(),
        )?;
        match resp.data {
            Some(data) if data.len() == len as usize => Ok(data),
            other => Err(WlfwError::ProtocolMismatch(format!(
                "athdiag read returned {:?} bytes, expected {}",
                other.map(|d| d.len()),
                len
            ))),
        }
    }

    pub fn athdiag_write(&self, offset: u32, mem_type: u32, data: &[u8]) -> Result<()> {
        check_diag_len(data.len())?;
        self.client.call(
            &AthdiagWriteReq {
                offset,
                mem_type,
                data: data.to_vec(),
            },
            CallOptions::advisory(),
        )?;
        Ok(())
    }

    /// Toggle firmware logging.
    pub fn ini_req(&self, enablefwlog: bool) -> Result<()> {
        self.client.call(
            &IniReq {
                enablefwlog: Some(enablefwlog),
            },
            CallOptions::advisory(),
        )?;
        Ok(())
    }

    /// Apply a feature mask; returns the previous and current masks the
    /// firmware reports.
    pub fn dynamic_feature_mask(&self, mask: u64) -> Result<(Option<u64>, Option<u64>)> {
        let resp = self.client.call(
            &DynamicFeatureMaskReq { mask: Some(mask) },
            CallOptions::advisory(),
        )?;
        debug!(prev = ?resp.prev_mask, curr = ?resp.curr_mask, "Feature mask applied");
        Ok((resp.prev_mask, resp.curr_mask))
    }

    /// Query the antenna in use and remember it.
    pub fn antenna_switch(&self) -> Result<Option<u64>> {
        let resp = self
            .client
            .call(&AntennaSwitchReq, CallOptions::advisory())?;
        if let Some(antenna) = resp.antenna {
            self.peer().antenna = antenna;
        }
        debug!(antenna = ?resp.antenna, "Antenna switch");
        Ok(resp.antenna)
    }

    /// Pass on the antenna grant obtained from COEX.
    pub fn antenna_grant(&self) -> Result<()> {
        let grant = self.peer().grant;
        debug!(grant = format_args!("0x{:x}", grant), "Sending antenna grant");
        self.client
            .call(&AntennaGrantReq { grant: Some(grant) }, CallOptions::advisory())?;
        Ok(())
    }

    pub fn m3_dump_upload_done(&self, pdev_id: u32, status: u32) -> Result<()> {
        debug!(pdev_id, status, "Sending M3 upload done");
        self.client.call(
            &M3DumpUploadDoneReq { pdev_id, status },
            CallOptions::advisory(),
        )?;
        Ok(())
    }

    /// Fetch the device BAR. Both fields are required and the size must
    /// match the expected BAR size. Fatal on failure.
    pub fn device_info(&self) -> Result<(u64, u32)> {
        let msg_id = QMI_WLFW_DEVICE_INFO_REQ;
        self.client.record(QMI_TYPE_REQ | msg_id, 0, 0);
        let result = self
            .client
            .transact(&DeviceInfoReq, self.client.default_timeout())
            .and_then(|resp| match (resp.bar_addr, resp.bar_size) {
                (Some(addr), Some(size)) if addr != 0 && size == DEVICE_BAR_SIZE => Ok((addr, size)),
                (addr, size) => Err(WlfwError::ProtocolMismatch(format!(
                    "invalid BAR address {:?} or size {:?}",
                    addr, size
                ))),
            });
        self.client
            .settle(msg_id, result.as_ref().err(), FaultScope::Fatal);

        let bar = result?;
        info!(
            bar_addr = format_args!("0x{:x}", bar.0),
            bar_size = format_args!("0x{:x}", bar.1),
            "Device BAR info"
        );
        self.peer().bar = Some(bar);
        Ok(bar)
    }

    /// Resend the multi-link topology after a WSI remap. Fatal on failure.
    pub fn mlo_reconfig(&self) -> Result<()> {
        let topology = self
            .config
            .mlo_topology()
            .cloned()
            .ok_or_else(|| WlfwError::InvalidState("multi-link not enabled".into()))?;
        self.client
            .call(&MloReconfigInfoReq { topology }, CallOptions::fatal())?;
        Ok(())
    }

    /// Relay an opaque Wi-Fi calling status payload.
    pub fn wfc_call_status(&self, data: &[u8]) -> Result<()> {
        if data.len() > QMI_WLFW_MAX_WFC_CALL_STATUS_DATA_SIZE {
            return Err(WlfwError::InvalidArgument(format!(
                "call status of {} bytes exceeds {}",
                data.len(),
                QMI_WLFW_MAX_WFC_CALL_STATUS_DATA_SIZE
            )));
        }
        self.client.call(
            &WfcCallStatusReq {
                data: data.to_vec(),
            },
            CallOptions::advisory(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MloConfig;
    use crate::history::MsgKind;
    use crate::service::testing::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_mode_off_during_recovery_is_noop() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        h.service.set_recovery(true);
        h.service.wlan_mode(WlanMode::Off).unwrap();
        assert!(h.mock.sent().is_empty());
    }

    #[test]
    fn test_mode_off_failure_tolerated() {
        let mock = MockTransport::new();
        mock.queue_send_error();
        let h = connected(mock, DriverState::empty());

        h.service.wlan_mode(WlanMode::Off).unwrap();
        assert_eq!(h.faults.count(), 0);
    }

    #[test]
    fn test_mission_mode_failure_is_fatal() {
        let mock = MockTransport::new();
        mock.queue_failure(0x01);
        let h = connected(mock, DriverState::empty());

        assert!(h.service.wlan_mode(WlanMode::Mission).is_err());
        assert_eq!(h.faults.count(), 1);
        let sent: Vec<WlanModeReq> = h.mock.sent_messages();
        assert_eq!(sent[0].hw_debug, Some(false));
    }

    #[test]
    fn test_wlan_cfg_clamped() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        let cfg = WlanCfgReq {
            host_version: "WIN".into(),
            shadow_reg_v2: vec![ShadowRegV2::default(); QMI_WLFW_MAX_NUM_SHADOW_REG_V2 + 4],
            ..Default::default()
        };
        h.service.wlan_cfg(cfg).unwrap();

        let sent: Vec<WlanCfgReq> = h.mock.sent_messages();
        assert_eq!(sent[0].shadow_reg_v2.len(), QMI_WLFW_MAX_NUM_SHADOW_REG_V2);
    }

    #[test]
    fn test_athdiag_bounds() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        assert!(h.service.athdiag_read(0, 0, 0).is_err());
        assert!(h
            .service
            .athdiag_write(0, 0, &vec![0; QMI_WLFW_MAX_DATA_SIZE + 1])
            .is_err());
        assert!(h.mock.sent().is_empty());
    }

    #[test]
    fn test_athdiag_read_length_checked() {
        let mock = MockTransport::new();
        mock.queue_response(&AthdiagReadResp {
            resp: ResponseStatus::SUCCESS,
            data: Some(vec![1, 2, 3, 4]),
        });
        mock.queue_response(&AthdiagReadResp {
            resp: ResponseStatus::SUCCESS,
            data: Some(vec![1, 2]),
        });
        let h = connected(mock, DriverState::empty());

        assert_eq!(h.service.athdiag_read(0x100, 1, 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(matches!(
            h.service.athdiag_read(0x100, 1, 4),
            Err(WlfwError::ProtocolMismatch(_))
        ));
        assert_eq!(h.faults.count(), 0);
    }

    #[test]
    fn test_antenna_switch_then_grant() {
        let mock = MockTransport::new();
        mock.queue_response(&AntennaSwitchResp {
            resp: ResponseStatus::SUCCESS,
            antenna: Some(2),
        });
        mock.queue_response(&AntennaGrantResp {
            resp: ResponseStatus::SUCCESS,
        });
        let h = connected(mock, DriverState::empty());
        h.service.peer().grant = 0x3;

        assert_eq!(h.service.antenna_switch().unwrap(), Some(2));
        assert_eq!(h.service.snapshot().antenna, 2);
        h.service.antenna_grant().unwrap();
        let sent: Vec<AntennaGrantReq> = h.mock.sent_messages();
        assert_eq!(sent[0].grant, Some(0x3));
    }

    #[test]
    fn test_device_info_bar_checked() {
        let mock = MockTransport::new();
        mock.queue_response(&DeviceInfoResp {
            resp: ResponseStatus::SUCCESS,
            bar_addr: Some(0x1000_0000),
            bar_size: Some(0x1000),
        });
        mock.queue_response(&DeviceInfoResp {
            resp: ResponseStatus::SUCCESS,
            bar_addr: Some(0x1000_0000),
            bar_size: Some(DEVICE_BAR_SIZE),
        });
        let h = connected(mock, DriverState::empty());

        assert!(h.service.device_info().is_err());
        assert_eq!(h.faults.count(), 1);
        let last = *h.service.history().entries().last().unwrap();
        assert_eq!(last.kind, MsgKind::Request);
        assert_eq!(last.error, -22);

        assert_eq!(
            h.service.device_info().unwrap(),
            (0x1000_0000, DEVICE_BAR_SIZE)
        );
        assert_eq!(h.service.snapshot().bar, Some((0x1000_0000, DEVICE_BAR_SIZE)));
    }

    #[test]
    fn test_mlo_reconfig_requires_topology() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        assert!(matches!(
            h.service.mlo_reconfig(),
            Err(WlfwError::InvalidState(_))
        ));

        let mut config = test_config();
        config.mlo = Some(MloConfig {
            enabled: true,
            capable: true,
            topology: MloTopology {
                chip_id: 1,
                group_id: 0,
                max_num_peers: 64,
                chips: Vec::new(),
            },
        });
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.service.client().connect(Default::default()).unwrap();
        h.service.mlo_reconfig().unwrap();
        let sent: Vec<MloReconfigInfoReq> = h.mock.sent_messages();
        assert_eq!(sent[0].topology.max_num_peers, 64);
    }

    #[test]
    fn test_wfc_call_status_bounded() {
        let h = connected(MockTransport::with_auto_success(), DriverState::empty());
        assert!(h
            .service
            .wfc_call_status(&[0; QMI_WLFW_MAX_WFC_CALL_STATUS_DATA_SIZE + 1])
            .is_err());
        h.service.wfc_call_status(&[1, 2, 3]).unwrap();
        assert_eq!(h.mock.sent_ids(), vec![QMI_WLFW_WFC_CALL_STATUS_REQ]);
    }
}
