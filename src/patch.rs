//! The `pendingNMI` locator/patcher.
//!
//! Only records whose name is exactly [`TARGET_FIELD`] are candidates;
//! everything else passes through the walker untouched. A candidate must be
//! exactly one byte — any other size is a format assumption violation and
//! aborts the run, it is never soft-skipped. The selection policy then
//! decides between reporting, skipping, and rewriting the byte in place.

use std::io::{Read, Seek, Write};

use crate::error::VmssError;
use crate::stream::{TagPayload, TagRecord, TagStream};

/// The one field this tool exists to rewrite: the per-CPU one-byte flag
/// indicating a pending non-maskable interrupt.
pub const TARGET_FIELD: &str = "pendingNMI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuFilter {
    /// Report every CPU's flag; never write.
    ReportOnly,
    /// Patch only the CPU with this index. An index that matches no record
    /// simply produces no write; the file is the authority on which CPUs
    /// exist.
    Cpu(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmiValue {
    Set,
    Clear,
}

impl NmiValue {
    pub fn byte(self) -> u8 {
        match self {
            NmiValue::Set => 1,
            NmiValue::Clear => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PatchConfig {
    pub filter: CpuFilter,
    pub value: NmiValue,
}

impl Default for PatchConfig {
    /// Set the flag on CPU 0.
    fn default() -> Self {
        Self {
            filter: CpuFilter::Cpu(0),
            value: NmiValue::Set,
        }
    }
}

/// What happened to one `pendingNMI` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    /// Report-only mode: observed, nothing written.
    Reported,
    /// The record's CPU did not match the configured target.
    Skipped { target: u32 },
    /// The byte was rewritten in place.
    Written { new: u8 },
}

#[derive(Debug, Clone, Copy)]
pub struct PatchReport {
    pub cpu: u32,
    pub previous: u8,
    pub action: PatchAction,
}

/// Examine one decoded record. Returns `Ok(None)` when the record is not a
/// `pendingNMI` candidate (blocks and foreign names are left unexamined —
/// the walker skips their bytes without them ever reaching this far). When
/// a write happens, the stream is left exactly past the rewritten byte.
pub fn apply<R: Read + Write + Seek>(
    stream: &mut TagStream<R>,
    record: &TagRecord,
    config: &PatchConfig,
) -> Result<Option<PatchReport>, VmssError> {
    let len = match record.payload {
        TagPayload::Scalar { len, .. } => len,
        TagPayload::Block(_) => return Ok(None),
    };
    if record.name != TARGET_FIELD {
        return Ok(None);
    }
    if len != 1 {
        return Err(VmssError::UnexpectedFieldSize { size: len });
    }

    let previous = stream.read_value()?[0];
    let cpu = record.indices[0];

    let action = match config.filter {
        CpuFilter::ReportOnly => PatchAction::Reported,
        CpuFilter::Cpu(target) if cpu != target => PatchAction::Skipped { target },
        CpuFilter::Cpu(_) => {
            let new = config.value.byte();
            stream.overwrite_last_byte(new)?;
            PatchAction::Written { new }
        }
    };

    Ok(Some(PatchReport {
        cpu,
        previous,
        action,
    }))
}
