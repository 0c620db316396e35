//! Bring-up exchanges: indication registration, host and target
//! capabilities, and the optional INI configuration download.

use tracing::{debug, info, instrument};

use super::WlfwService;
use crate::chunk::stream_download;
use crate::error::{Result, WlfwError};
use crate::events::{LogLevel, WlfwEvent};
use crate::fault::FaultScope;
use crate::protocol::constants::*;
use crate::protocol::messages::{CapReq, HostCapReq, IndRegisterReq, IniFileDownloadReq};
use crate::state::DriverState;
use crate::transport::QmiTransport;
use crate::txn::CallOptions;

impl<T: QmiTransport> WlfwService<T> {
    /// Subscribe to the indication classes the host handles.
    ///
    /// Returns `AlreadyRegistered` when the firmware reports a previous
    /// registration; callers treat that as success.
    pub fn ind_register(&self) -> Result<()> {
        let resp = self
            .client
            .call(&IndRegisterReq::host_default(), CallOptions::fatal())?;
        if resp.already_registered() {
            debug!("Firmware reports indications already registered");
            return Err(WlfwError::AlreadyRegistered);
        }
        Ok(())
    }

    /// Build the host capability request from configuration and state.
    pub fn host_cap_request(&self) -> Result<HostCapReq> {
        let config = &self.config;
        let gpios = &config.device.gpios;
        if gpios.len() > QMI_WLFW_MAX_NUM_GPIO {
            return Err(WlfwError::InvalidArgument(format!(
                "{} GPIOs, at most {} allowed",
                gpios.len(),
                QMI_WLFW_MAX_NUM_GPIO
            )));
        }

        let fw_ini_cfg_support = self.blobs.exists(&config.fw_file(FW_INI_CFG_FILE_NAME));
        let (cal_in_progress, cal_done, mem_cfg_mode) = {
            let mut peer = self.peer();
            peer.fw_ini_cfg_support = fw_ini_cfg_support;
            (
                peer.flags.contains(DriverState::CAL_IN_PROGRESS),
                peer.cal_done,
                peer.tgt_mem_cfg_mode,
            )
        };

        let mlo = if cal_in_progress {
            None
        } else {
            config.mlo_topology().cloned()
        };

        Ok(HostCapReq {
            num_clients: Some(1),
            fw_ini_cfg_support: Some(fw_ini_cfg_support),
            mem_cfg_mode: Some(mem_cfg_mode as u8),
            bdf_support: Some(true),
            cal_done: Some(cal_done),
            platform_name: config.device.platform_model.clone(),
            gpios: (!gpios.is_empty()).then(|| gpios.clone()),
            mlo,
            num_wlan_clients: config.num_wlan_clients(),
            num_wlan_vaps: config.num_wlan_vaps(),
        })
    }

    /// Send host capabilities. Fatal on failure.
    pub fn host_cap(&self) -> Result<()> {
        let req = match self.host_cap_request() {
            Ok(req) => req,
            Err(e) => {
                self.client.record(QMI_WLFW_HOST_CAP_REQ, e.errno(), 0);
                self.client.fail(QMI_WLFW_HOST_CAP_REQ, &e, FaultScope::Fatal);
                return Err(e);
            }
        };
        info!(
            mem_cfg_mode = req.mem_cfg_mode,
            ini = req.fw_ini_cfg_support,
            mlo = req.mlo.is_some(),
            "Sending host capabilities"
        );
        self.client.call(&req, CallOptions::fatal())?;
        Ok(())
    }

    /// Query target capabilities into the board identity. Fatal on failure.
    pub fn tgt_cap(&self) -> Result<()> {
        let resp = self.client.call(&CapReq, CallOptions::fatal())?;
        let mut peer = self.peer();
        peer.identity.apply(&resp);
        let id = &peer.identity;
        info!(
            chip_id = id.chip_id,
            chip_family = id.chip_family,
            board_id = id.board_id,
            soc_id = id.soc_id,
            fw_version = id.fw_version,
            fw_build = %id.fw_build_timestamp,
            "Target capabilities"
        );
        Ok(())
    }

    /// Stream the INI configuration file. Fatal on failure, a missing file
    /// included.
    #[instrument(skip(self))]
    pub fn ini_file_download(&self) -> Result<()> {
        let name = self.config.fw_file(FW_INI_CFG_FILE_NAME);
        let data = match self.blobs.fetch(&name) {
            Ok(data) => data,
            Err(e) => {
                let err = WlfwError::from(e);
                self.client.record(QMI_WLFW_INI_FILE_DOWNLOAD_REQ, err.errno(), 0);
                self.client
                    .fail(QMI_WLFW_INI_FILE_DOWNLOAD_REQ, &err, FaultScope::Fatal);
                return Err(err);
            }
        };
        self.log(LogLevel::Info, format!("Downloading {} ({} bytes)", name, data.len()));

        let rounds = stream_download(
            &self.client,
            &data,
            self.config.max_chunk,
            self.client.default_timeout(),
            FaultScope::Fatal,
            |round| IniFileDownloadReq {
                file_type: INI_CFG_FILE_TYPE,
                total_size: round.remaining,
                seg_id: round.seg_id,
                data: round.data.to_vec(),
                end: round.end,
            },
        )?;
        self.emit(WlfwEvent::Progress {
            operation: name,
            current: rounds as u64,
            total: rounds as u64,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::config::MloConfig;
    use crate::error::WlfwError;
    use crate::protocol::constants::*;
    use crate::protocol::messages::*;
    use crate::state::DriverState;
    use crate::transport::{MockTransport, ServiceAddress};

    fn mlo_config() -> MloConfig {
        MloConfig {
            enabled: true,
            capable: true,
            topology: MloTopology {
                chip_id: 0,
                group_id: 1,
                max_num_peers: 128,
                chips: Vec::new(),
            },
        }
    }

    #[test]
    fn test_host_cap_fields() {
        let mut config = test_config();
        config.params.mem_mode = 2;
        config.device.platform_model = Some("RDP433".into());
        config.device.gpios = vec![12, 13];
        config.params.num_wlan_clients = 512;
        config.mlo = Some(mlo_config());
        let h = harness_with(MockTransport::with_auto_success(), config);

        let req = h.service.host_cap_request().unwrap();
        assert_eq!(req.num_clients, Some(1));
        assert_eq!(req.mem_cfg_mode, Some(2));
        assert_eq!(req.bdf_support, Some(true));
        assert_eq!(req.fw_ini_cfg_support, Some(false));
        assert_eq!(req.platform_name.as_deref(), Some("RDP433"));
        assert_eq!(req.gpios, Some(vec![12, 13]));
        assert_eq!(req.num_wlan_clients, Some(512));
        assert_eq!(req.num_wlan_vaps, None);
        assert_eq!(req.mlo.unwrap().max_num_peers, 128);
    }

    #[test]
    fn test_calibration_suppresses_mlo() {
        let mut config = test_config();
        config.mlo = Some(mlo_config());
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.service.set_cal_in_progress(true);

        assert!(h.service.host_cap_request().unwrap().mlo.is_none());
    }

    #[test]
    fn test_too_many_gpios_is_fatal() {
        let mut config = test_config();
        config.device.gpios = (0..33).collect();
        let h = harness_with(MockTransport::with_auto_success(), config);

        let err = h.service.host_cap().unwrap_err();
        assert!(matches!(err, WlfwError::InvalidArgument(_)));
        assert_eq!(err.errno(), -22);
        assert_eq!(h.faults.count(), 1);
        assert!(h.mock.sent().is_empty());
    }

    #[test]
    fn test_ini_present_is_downloaded() {
        let mut config = test_config();
        config.fw_path = "qcn9224/".into();
        config.max_chunk = 4;
        let h = harness_with(MockTransport::with_auto_success(), config);
        h.blobs.insert("qcn9224/firmware_rdp_feature.ini", b"[feat]\nx=1".to_vec());

        h.service.server_arrive(ServiceAddress::default()).unwrap();

        let cap: Vec<HostCapReq> = h.mock.sent_messages();
        assert_eq!(cap[0].fw_ini_cfg_support, Some(true));
        let ini: Vec<IniFileDownloadReq> = h.mock.sent_messages();
        assert_eq!(ini.len(), 3);
        assert_eq!(ini[0].total_size, 10);
        assert_eq!(ini[2].data, b"=1");
        assert!(ini[2].end);
        assert!(ini.iter().all(|r| r.file_type == INI_CFG_FILE_TYPE));
    }

    #[test]
    fn test_tgt_cap_without_board_id() {
        let mock = MockTransport::new();
        mock.queue_response(&CapResp {
            resp: ResponseStatus::SUCCESS,
            chip_info: Some((0x1B, 0x4)),
            ..Default::default()
        });
        let h = connected(mock, DriverState::empty());
        h.service.peer().identity.board_id = 0;

        h.service.tgt_cap().unwrap();
        assert_eq!(h.service.identity().board_id, 0xFF);
        assert_eq!(h.service.identity().chip_id, 0x1B);
    }
}
