//! High-level [`Snapshot`] API — the primary embedding surface.
//!
//! ```no_run
//! use vmss_nmi::patch::{CpuFilter, NmiValue, PatchConfig};
//! use vmss_nmi::snapshot::Snapshot;
//!
//! let mut snap = Snapshot::open("suspended.vmss")?;
//! let reports = snap.patch_pending_nmi(
//!     &PatchConfig { filter: CpuFilter::Cpu(0), value: NmiValue::Set },
//!     None,
//! )?;
//! for r in &reports {
//!     println!("CPU {} was {}", r.cpu, r.previous);
//! }
//! # Ok::<(), vmss_nmi::VmssError>(())
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::VmssError;
use crate::group::{read_group_table, GroupDescriptor, CPU_GROUP};
use crate::header::ContainerHeader;
use crate::patch::{self, PatchConfig, PatchReport};
use crate::stream::{TagRecord, TagStream};

/// Callback invoked for every decoded record during a walk, before the
/// patcher sees it. Used by the CLI for verbose narration.
pub type TagObserver<'a> = &'a mut dyn FnMut(&TagRecord);

/// An open snapshot: one read+write handle for the whole run, header and
/// group table loaded once and read-only thereafter.
#[derive(Debug)]
pub struct Snapshot {
    file: File,
    path: PathBuf,
    header: ContainerHeader,
    groups: Vec<GroupDescriptor>,
}

impl Snapshot {
    /// Open for read and update. The handle stays open until the `Snapshot`
    /// is dropped; a report-only run simply never issues a write on it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VmssError> {
        let path = path.as_ref().to_owned();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| VmssError::Open {
                path: path.clone(),
                source,
            })?;

        let header = ContainerHeader::read(&mut file)?;
        let groups = read_group_table(&mut file, header.group_count)?;

        Ok(Self {
            file,
            path,
            header,
            groups,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn groups(&self) -> &[GroupDescriptor] {
        &self.groups
    }

    /// Walk every group named `"cpu"` in table order, feeding each decoded
    /// record through the patcher. Returns one report per `pendingNMI`
    /// record encountered, in file order.
    pub fn patch_pending_nmi(
        &mut self,
        config: &PatchConfig,
        mut observer: Option<TagObserver>,
    ) -> Result<Vec<PatchReport>, VmssError> {
        let mut reports = Vec::new();
        for group in &self.groups {
            if group.name_str() != CPU_GROUP {
                continue;
            }
            let mut stream = TagStream::new(&mut self.file, group)?;
            while let Some(record) = stream.next_record()? {
                if let Some(cb) = observer.as_mut() {
                    cb(&record);
                }
                if let Some(report) = patch::apply(&mut stream, &record, config)? {
                    reports.push(report);
                }
            }
        }
        Ok(reports)
    }
}
