//! Memory hand-off, board-data download, M3 information and the legacy
//! calibration report.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::bdf::{BdfKind, BdfTarget, padded_file_name};
use super::{MemoryReserver, WlfwService};
use crate::blob::BlobError;
use crate::chunk::stream_download;
use crate::error::{Result, WlfwError, errno};
use crate::events::{LogLevel, WlfwEvent};
use crate::fault::FaultScope;
use crate::lock;
use crate::protocol::constants::*;
use crate::protocol::messages::{BdfDownloadReq, CalReportReq, M3InfoReq, MemSegGrant, RespondMemReq};
use crate::state::{BdfMethod, FwMemSegment};
use crate::transport::QmiTransport;
use crate::txn::CallOptions;

/// Page-aligned allocator over one fixed physical window.
pub struct BumpReserver {
    next: Mutex<u64>,
    end: u64,
}

impl BumpReserver {
    pub fn new(base: u64, len: u64) -> Self {
        Self {
            next: Mutex::new(base),
            end: base + len,
        }
    }
}

impl MemoryReserver for BumpReserver {
    fn reserve(&self, size: u32, mem_type: u32) -> Result<(u64, u64)> {
        let mut next = lock(&self.next);
        let phys = next.next_multiple_of(PAGE_SIZE);
        let end = phys + u64::from(size);
        if size == 0 || end > self.end {
            return Err(WlfwError::NoMemory { mem_type });
        }
        *next = end;
        Ok((phys, phys))
    }
}

/// What the download sends for one artifact.
enum Payload {
    Contents(Vec<u8>),
    /// File name only, with the type code and timeout to use.
    Name(Vec<u8>, u8, Option<Duration>),
}

impl<T: QmiTransport> WlfwService<T> {
    /// Fill physical and virtual handles for every requested segment that
    /// has none yet.
    pub fn reserve_firmware_memory(&self, reserver: &dyn MemoryReserver) -> Result<()> {
        let mut reserved = self.peer().fw_mem.clone();
        for seg in reserved.iter_mut().filter(|s| !s.is_reserved() && s.size != 0) {
            let (phys, virt) = reserver.reserve(seg.size, seg.mem_type)?;
            debug!(
                mem_type = seg.mem_type,
                size = seg.size,
                phys = format_args!("0x{:x}", phys),
                "Reserved firmware memory"
            );
            seg.phys = phys;
            seg.virt = virt;
        }
        self.peer().fw_mem = reserved;
        Ok(())
    }

    /// Report the reserved segments back to the firmware. Fatal on failure.
    ///
    /// With cold-boot calibration support every segment must be reserved;
    /// the request is not sent otherwise.
    pub fn respond_mem(&self) -> Result<()> {
        let segments = self.peer().fw_mem.clone();
        if self.config.cold_boot_support {
            if let Some(seg) = segments.iter().find(|s| !s.is_reserved()) {
                let err = if seg.mem_type == 0 {
                    WlfwError::InvalidArgument("memory segment without a type".into())
                } else {
                    WlfwError::NoMemory {
                        mem_type: seg.mem_type,
                    }
                };
                self.client.record(QMI_WLFW_RESPOND_MEM_REQ, err.errno(), 0);
                self.client.fail(QMI_WLFW_RESPOND_MEM_REQ, &err, FaultScope::Fatal);
                return Err(err);
            }
        }

        let req = RespondMemReq {
            segments: segments
                .iter()
                .map(|s| MemSegGrant {
                    addr: s.phys,
                    size: s.size,
                    mem_type: s.mem_type,
                })
                .collect(),
        };
        info!(segments = req.segments.len(), "Responding to memory request");
        self.client.call(&req, CallOptions::fatal())?;
        Ok(())
    }

    /// M3 region the host set aside for the firmware.
    pub fn set_m3_memory(&self, seg: FwMemSegment) {
        self.peer().m3_mem = Some(seg);
    }

    /// Send the M3 region. Fatal on failure; the region is mandatory for
    /// QCN9000 and QCN9224.
    pub fn m3_info(&self) -> Result<()> {
        let m3 = self.peer().m3_mem.unwrap_or_default();
        let device_id = self.config.device.device_id;
        if matches!(device_id, QCN9000_DEVICE_ID | QCN9224_DEVICE_ID) && !m3.is_reserved() {
            let err = WlfwError::NoMemory {
                mem_type: m3.mem_type,
            };
            self.client.record(QMI_WLFW_M3_INFO_REQ, err.errno(), 0);
            self.client.fail(QMI_WLFW_M3_INFO_REQ, &err, FaultScope::Fatal);
            return Err(err);
        }
        self.client.call(
            &M3InfoReq {
                addr: m3.phys,
                size: m3.size,
            },
            CallOptions::fatal(),
        )?;
        Ok(())
    }

    /// Legacy calibration report. Advisory.
    pub fn cal_report(&self, cal_file_download_size: u32) -> Result<()> {
        self.client.call(
            &CalReportReq {
                cal_file_download_size: Some(cal_file_download_size),
            },
            CallOptions::advisory(),
        )?;
        Ok(())
    }

    /// Board data, RegDB, calibration data, HDS and, when supported, the RX
    /// gain LUT, in that order.
    pub fn download_board_files(&self) -> Result<()> {
        self.bdf_download(BdfKind::BoardData)?;
        self.bdf_download(BdfKind::RegDb)?;
        self.bdf_download(BdfKind::CalData)?;
        self.bdf_download(BdfKind::Hds)?;
        if self.peer().identity.rxgainlut_support {
            self.bdf_download(BdfKind::RxGainLut)?;
        }
        Ok(())
    }

    fn ftm_marker_present(&self) -> bool {
        self.config
            .ftm_marker_path
            .as_ref()
            .is_some_and(|p| p.exists())
    }

    /// Download one board-data artifact.
    #[instrument(skip(self))]
    pub fn bdf_download(&self, kind: BdfKind) -> Result<()> {
        let identity = self.identity();
        let target = BdfTarget::new(&self.config, &identity, self.ftm_marker_present());
        let candidates = target.candidates(kind);
        let Some(name) = candidates
            .iter()
            .find(|n| self.blobs.exists(n))
            .or(candidates.last())
            .cloned()
        else {
            return Err(WlfwError::InvalidArgument(format!("no file name for {kind}")));
        };

        let device_id = self.config.device.device_id;
        let by_name = matches!(kind, BdfKind::BoardData | BdfKind::CalData)
            && identity.bdf_method == BdfMethod::DirectCopy;
        let eeprom = kind == BdfKind::CalData
            && identity.eeprom_caldata_read_timeout != 0
            && matches!(device_id, QCN9000_DEVICE_ID | QCN9224_DEVICE_ID);

        let payload = if by_name {
            debug!(file = %name, "Download through direct copy");
            Payload::Name(padded_file_name(&name), kind.bdf_type(), None)
        } else if eeprom {
            let secs = u64::from(identity.eeprom_caldata_read_timeout);
            Payload::Name(
                padded_file_name(&name),
                BDF_TYPE_EEPROM,
                Some(Duration::from_millis(secs * 1000)),
            )
        } else {
            match self.blobs.fetch(&name) {
                Ok(data) => Payload::Contents(data),
                Err(BlobError::NotFound(_)) => {
                    return self.missing_board_file(kind, &name, identity.regdb_mandatory);
                }
                Err(e) => {
                    let err = WlfwError::from(e);
                    self.client.record(QMI_WLFW_BDF_DOWNLOAD_REQ, err.errno(), 0);
                    self.client
                        .fail(QMI_WLFW_BDF_DOWNLOAD_REQ, &err, FaultScope::Fatal);
                    return Err(err);
                }
            }
        };

        let (data, bdf_type, timeout) = match payload {
            Payload::Contents(data) => (data, kind.bdf_type(), None),
            Payload::Name(data, bdf_type, timeout) => (data, bdf_type, timeout),
        };
        let file_id = identity.board_id;
        info!(file = %name, len = data.len(), bdf_type, "Downloading {}", kind);

        let rounds = stream_download(
            &self.client,
            &data,
            self.config.max_chunk,
            timeout.unwrap_or(self.client.default_timeout()),
            FaultScope::Fatal,
            |round| BdfDownloadReq {
                valid: true,
                file_id,
                total_size: round.remaining,
                seg_id: round.seg_id,
                data: round.data.to_vec(),
                end: round.end,
                bdf_type,
            },
        )?;
        self.emit(WlfwEvent::Progress {
            operation: name,
            current: rounds as u64,
            total: rounds as u64,
        });
        Ok(())
    }

    fn missing_board_file(&self, kind: BdfKind, name: &str, regdb_mandatory: bool) -> Result<()> {
        let fatal = match kind {
            BdfKind::BoardData => true,
            BdfKind::RegDb => regdb_mandatory,
            BdfKind::CalData | BdfKind::Hds | BdfKind::RxGainLut => false,
        };
        let err = WlfwError::Blob(BlobError::NotFound(name.to_string()));
        if fatal {
            self.client.record(QMI_WLFW_BDF_DOWNLOAD_REQ, err.errno(), 0);
            self.client.fail(QMI_WLFW_BDF_DOWNLOAD_REQ, &err, FaultScope::Fatal);
            return Err(err);
        }
        if kind == BdfKind::CalData {
            self.client
                .record(QMI_WLFW_BDF_DOWNLOAD_REQ, 0, -errno::ENOENT);
        }
        warn!(file = %name, "{} not found, skipping", kind);
        self.log(LogLevel::Warn, format!("{} {} not found, skipped", kind, name));
        Ok(())
    }
}
