//! Server arrival and departure.

use tracing::{info, instrument, warn};

use super::WlfwService;
use crate::error::{Result, WlfwError};
use crate::events::WlfwEvent;
use crate::fault::FaultScope;
use crate::state::{DriverState, LifecycleState};
use crate::transport::{QmiTransport, ServiceAddress};

impl<T: QmiTransport> WlfwService<T> {
    /// A WLFW server showed up: bind the channel and run bring-up in the
    /// calling context.
    #[instrument(skip(self), fields(instance = self.client.instance_id()))]
    pub fn server_arrive(&self, addr: ServiceAddress) -> Result<()> {
        {
            let mut peer = self.peer();
            peer.flags
                .remove(DriverState::FW_READY | DriverState::FW_MEM_READY);
            peer.address = Some(addr);
        }
        self.set_lifecycle(LifecycleState::Arrived);

        if let Err(e) = self.client.connect(addr) {
            let err = WlfwError::from(e);
            self.client.fail(0, &err, FaultScope::Fatal);
            return Err(err);
        }
        self.peer().flags.insert(DriverState::WLFW_CONNECTED);
        self.set_lifecycle(LifecycleState::Connected);
        info!(addr = %addr, "WLFW server connected");

        self.bringup()
    }

    /// Ordered bring-up; stops at the first hard failure.
    #[instrument(skip(self))]
    pub fn bringup(&self) -> Result<()> {
        match self.ind_register() {
            Ok(()) => {}
            Err(WlfwError::AlreadyRegistered) => {
                info!("Indications already registered, continuing");
            }
            Err(e) => return Err(e),
        }
        self.host_cap()?;
        self.tgt_cap()?;
        if self.peer().fw_ini_cfg_support {
            self.ini_file_download()?;
        }

        self.set_lifecycle(LifecycleState::BringupComplete);
        self.emit(WlfwEvent::BringupComplete);
        Ok(())
    }

    /// The server went away. Negotiated state is kept.
    pub fn server_exit(&self) {
        warn!(instance = self.client.instance_id(), "WLFW server exiting");
        self.peer().flags.remove(DriverState::WLFW_CONNECTED);
        self.client.disconnect();
        self.set_lifecycle(LifecycleState::Disconnected);
    }

    /// Whether the single-client IPC daemon is attached.
    pub fn set_daemon_connected(&self, connected: bool) {
        self.peer().flags.set(DriverState::DAEMON_CONNECTED, connected);
    }

    /// Mark a recovery flow as owning the device.
    pub fn set_recovery(&self, active: bool) {
        self.peer().flags.set(DriverState::DRIVER_RECOVERY, active);
    }

    pub fn set_cal_in_progress(&self, active: bool) {
        self.peer().flags.set(DriverState::CAL_IN_PROGRESS, active);
    }

    /// Host-side cold-boot calibration finished.
    pub fn set_cal_done(&self, done: bool) {
        self.peer().cal_done = done;
    }
}
